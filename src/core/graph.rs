// src/core/graph.rs

//! Translates a [`ScanResult`] into graph nodes, edges and findings.
//!
//! Node ids are derived only from the asset they describe, so building the
//! same result twice upserts the same keys instead of duplicating nodes.
//! Edges carry no key and do duplicate on a rebuild.

use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::core::knowledge_base::sensitive_path_finding;
use crate::core::models::{
    empty_object, EdgeType, GraphEdge, GraphNode, NodeType, RiskScore, ScanResult, SessionId, TargetId,
};
use crate::core::risk::{path_risk, port_risk, target_risk};
use crate::core::store::ReconStore;

/// Fixed score of the root-domain node, independent of scan content.
const ROOT_NODE_RISK: i64 = 10;

pub fn domain_node_id(domain: &str) -> String {
    format!("domain:{domain}")
}

pub fn ip_node_id(ip: &str) -> String {
    format!("ip:{ip}")
}

pub fn port_node_id(domain: &str, port: u16) -> String {
    format!("port:{domain}:{port}")
}

pub fn url_node_id(url: &str) -> String {
    format!("url:{url}")
}

pub fn path_node_id(domain: &str, path: &str) -> String {
    format!("path:{domain}{path}")
}

/// What one [`GraphBuilder::build`] pass managed to write.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildOutcome {
    pub target_id: Option<TargetId>,
    pub risk_score: RiskScore,
    pub nodes_written: usize,
    pub edges_written: usize,
    pub findings_created: usize,
    /// Writes the store refused. The pass carries on past each of them.
    pub failed_writes: usize,
}

/// Writes the graph of one session through an injected store.
pub struct GraphBuilder<'a, S: ReconStore + ?Sized> {
    store: &'a S,
    session_id: SessionId,
}

impl<'a, S: ReconStore + ?Sized> GraphBuilder<'a, S> {
    pub fn new(store: &'a S, session_id: SessionId) -> Self {
        Self { store, session_id }
    }

    /// Emits every node, edge and finding for `scan`.
    ///
    /// Each write is attempted on its own: a store failure is logged and
    /// counted in [`BuildOutcome::failed_writes`], and the pass continues.
    pub fn build(&self, scan: &ScanResult) -> BuildOutcome {
        let mut outcome = BuildOutcome::default();
        let domain = scan.domain.as_str();
        let root_id = domain_node_id(&scan.root_domain);
        let subdomain_id = domain_node_id(domain);

        info!(session_id = self.session_id, domain, root = %scan.root_domain, "Building recon graph.");

        self.put_node(
            &mut outcome,
            root_id.clone(),
            NodeType::Domain,
            scan.root_domain.clone(),
            json!({ "type": "root_domain" }),
            RiskScore::clamped(ROOT_NODE_RISK),
        );

        outcome.target_id = match self.store.create_target(self.session_id, scan) {
            Ok(id) => Some(id),
            Err(e) => {
                warn!(domain, error = %e, "Failed to record target.");
                outcome.failed_writes += 1;
                None
            }
        };

        let risk = target_risk(scan);
        outcome.risk_score = risk;
        if let Some(tid) = outcome.target_id {
            if let Err(e) = self.store.update_target_risk(tid, risk) {
                warn!(target_id = tid, error = %e, "Failed to store target risk.");
                outcome.failed_writes += 1;
            }
        }

        let target_id = outcome.target_id;
        self.put_node(
            &mut outcome,
            subdomain_id.clone(),
            NodeType::Subdomain,
            domain.to_string(),
            json!({ "target_id": target_id, "infra": scan.infra }),
            risk,
        );
        let first_label = domain.split('.').next().unwrap_or(domain).to_string();
        self.put_edge(&mut outcome, &root_id, &subdomain_id, EdgeType::HasSubdomain, first_label);

        let ptr = scan.ptr_values();
        for ip in &scan.ips {
            let ip_id = ip_node_id(ip);
            self.put_node(
                &mut outcome,
                ip_id.clone(),
                NodeType::Ip,
                ip.clone(),
                json!({ "ptr": ptr }),
                RiskScore::MIN,
            );
            self.put_edge(&mut outcome, &subdomain_id, &ip_id, EdgeType::ResolvesTo, String::new());
        }

        for &port in &scan.ports {
            let service = scan.service_for(port);
            let port_id = port_node_id(domain, port);
            self.put_node(
                &mut outcome,
                port_id.clone(),
                NodeType::Port,
                format!(":{port} ({service})"),
                json!({ "service": service, "port": port }),
                port_risk(port, service),
            );
            self.put_edge(&mut outcome, &subdomain_id, &port_id, EdgeType::Exposes, String::new());
        }

        for alive in &scan.alive {
            let url = alive.requested_url.as_str();
            if url.is_empty() {
                continue;
            }
            let url_id = url_node_id(url);
            self.put_node(
                &mut outcome,
                url_id.clone(),
                NodeType::Url,
                url.to_string(),
                json!({
                    "server": alive.server_header,
                    "cdn": alive.cdn_name,
                    "status": alive.final_status,
                    "chain": alive.redirect_chain,
                }),
                RiskScore::MIN,
            );
            self.put_edge(&mut outcome, &subdomain_id, &url_id, EdgeType::Serves, String::new());

            let final_url = alive.final_url.as_str();
            if !final_url.is_empty() && final_url != url {
                let final_id = url_node_id(final_url);
                self.put_node(
                    &mut outcome,
                    final_id.clone(),
                    NodeType::Url,
                    final_url.to_string(),
                    json!({ "type": "redirect_target" }),
                    RiskScore::MIN,
                );
                self.put_edge(&mut outcome, &url_id, &final_id, EdgeType::RedirectsTo, String::new());
            }
        }

        for path in scan.dirb.iter().map(|p| p.trim()).filter(|p| !p.is_empty()) {
            let score = path_risk(path);
            let path_id = path_node_id(domain, path);
            self.put_node(
                &mut outcome,
                path_id.clone(),
                NodeType::Path,
                path.to_string(),
                json!({ "domain": domain }),
                score,
            );
            self.put_edge(&mut outcome, &subdomain_id, &path_id, EdgeType::Contains, String::new());

            if let Some(finding) = sensitive_path_finding(self.session_id, domain, path, score.value()) {
                match self.store.create_finding(&finding) {
                    Ok(id) => {
                        debug!(finding_id = id, path, severity = %finding.severity, "Finding created.");
                        outcome.findings_created += 1;
                    }
                    Err(e) => {
                        warn!(path, error = %e, "Failed to create finding.");
                        outcome.failed_writes += 1;
                    }
                }
            }
        }

        info!(
            domain,
            risk = %risk,
            nodes = outcome.nodes_written,
            edges = outcome.edges_written,
            findings = outcome.findings_created,
            failed = outcome.failed_writes,
            "Recon graph built."
        );
        outcome
    }

    fn put_node(
        &self,
        outcome: &mut BuildOutcome,
        node_id: String,
        node_type: NodeType,
        label: String,
        attributes: Value,
        risk_score: RiskScore,
    ) {
        let node = GraphNode {
            session_id: self.session_id,
            node_id,
            node_type,
            label,
            attributes,
            risk_score,
            position: None,
        };
        match self.store.upsert_node(&node) {
            Ok(()) => outcome.nodes_written += 1,
            Err(e) => {
                warn!(node_id = %node.node_id, error = %e, "Failed to upsert node.");
                outcome.failed_writes += 1;
            }
        }
    }

    fn put_edge(&self, outcome: &mut BuildOutcome, source: &str, target: &str, edge_type: EdgeType, label: String) {
        let edge = GraphEdge {
            session_id: self.session_id,
            source_node_id: source.to_string(),
            target_node_id: target.to_string(),
            edge_type,
            label,
            attributes: empty_object(),
        };
        match self.store.append_edge(&edge) {
            Ok(()) => outcome.edges_written += 1,
            Err(e) => {
                warn!(from = source, to = target, edge_type = %edge_type, error = %e, "Failed to append edge.");
                outcome.failed_writes += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::{Finding, LivenessResult, Severity};
    use crate::core::store::{MemoryStore, StoreError};
    use std::collections::BTreeSet;

    fn sample_scan() -> ScanResult {
        let mut scan = ScanResult::new("example.com", "www.example.com");
        scan.ips.insert("93.184.216.34".into());
        scan.ports.extend([80, 3306]);
        scan.port_detail.insert(80, "http".into());
        scan.port_detail.insert(3306, "mysql 5.7".into());
        scan.alive.push(LivenessResult {
            requested_url: "http://www.example.com".into(),
            final_url: "https://www.example.com/".into(),
            final_status: 200,
            server_header: "ECS".into(),
            redirect_chain: vec![301],
            cdn_name: String::new(),
        });
        scan.dirb.extend(["/admin".to_string(), "/robots.txt".to_string()]);
        scan
    }

    fn node_ids(store: &MemoryStore, session: SessionId) -> BTreeSet<String> {
        store.graph(session).unwrap().nodes.into_iter().map(|n| n.node_id).collect()
    }

    #[test]
    fn emits_expected_node_ids_and_edges() {
        let store = MemoryStore::new();
        let outcome = GraphBuilder::new(&store, 1).build(&sample_scan());

        let expected: BTreeSet<String> = [
            "domain:example.com",
            "domain:www.example.com",
            "ip:93.184.216.34",
            "port:www.example.com:80",
            "port:www.example.com:3306",
            "url:http://www.example.com",
            "url:https://www.example.com/",
            "path:www.example.com/admin",
            "path:www.example.com/robots.txt",
        ]
        .into_iter()
        .map(String::from)
        .collect();
        assert_eq!(node_ids(&store, 1), expected);

        let graph = store.graph(1).unwrap();
        let count = |t: EdgeType| graph.links.iter().filter(|e| e.edge_type == t).count();
        assert_eq!(count(EdgeType::HasSubdomain), 1);
        assert_eq!(count(EdgeType::ResolvesTo), 1);
        assert_eq!(count(EdgeType::Exposes), 2);
        assert_eq!(count(EdgeType::Serves), 1);
        assert_eq!(count(EdgeType::RedirectsTo), 1);
        assert_eq!(count(EdgeType::Contains), 2);
        assert_eq!(outcome.failed_writes, 0);
        // 3306 (25) + /admin (80 / 5) + /robots.txt (10 / 5)
        assert_eq!(outcome.risk_score.value(), 43);
    }

    #[test]
    fn node_risk_and_labels() {
        let store = MemoryStore::new();
        GraphBuilder::new(&store, 1).build(&sample_scan());
        let graph = store.graph(1).unwrap();
        let find = |id: &str| graph.nodes.iter().find(|n| n.node_id == id).unwrap().clone();

        let root = find("domain:example.com");
        assert_eq!(root.risk_score.value(), 10);
        assert_eq!(root.node_type, NodeType::Domain);

        let mysql = find("port:www.example.com:3306");
        assert_eq!(mysql.label, ":3306 (mysql 5.7)");
        assert_eq!(mysql.risk_score.value(), 30);

        assert_eq!(find("path:www.example.com/admin").risk_score.value(), 80);
        assert_eq!(find("domain:www.example.com").risk_score.value(), 43);

        let edge = graph.links.iter().find(|e| e.edge_type == EdgeType::HasSubdomain).unwrap();
        assert_eq!(edge.label, "www");
    }

    #[test]
    fn rebuilding_upserts_nodes_but_duplicates_edges() {
        let store = MemoryStore::new();
        let builder = GraphBuilder::new(&store, 3);
        let first = builder.build(&sample_scan());
        let nodes_after_first = store.graph(3).unwrap().nodes.len();
        builder.build(&sample_scan());

        let graph = store.graph(3).unwrap();
        assert_eq!(graph.nodes.len(), nodes_after_first);
        assert_eq!(graph.links.len(), first.edges_written * 2);
    }

    #[test]
    fn sensitive_paths_raise_findings() {
        let store = MemoryStore::new();
        let mut scan = sample_scan();
        scan.dirb.extend(["/debug".to_string(), "/login".to_string()]);
        let outcome = GraphBuilder::new(&store, 1).build(&scan);

        let findings = store.findings(1).unwrap();
        assert_eq!(outcome.findings_created, 2);
        assert_eq!(findings[0].finding.severity, Severity::High);
        assert_eq!(findings[0].finding.endpoint, "www.example.com/admin");
        assert_eq!(findings[1].finding.severity, Severity::Medium);
        assert_eq!(findings[1].finding.title, "Sensitive Path: /debug");
    }

    #[test]
    fn same_final_url_emits_no_redirect_edge() {
        let store = MemoryStore::new();
        let mut scan = ScanResult::new("a.io", "a.io");
        scan.alive.push(LivenessResult {
            requested_url: "https://a.io".into(),
            final_url: "https://a.io".into(),
            final_status: 200,
            server_header: String::new(),
            redirect_chain: vec![],
            cdn_name: String::new(),
        });
        GraphBuilder::new(&store, 1).build(&scan);
        let graph = store.graph(1).unwrap();
        assert!(graph.links.iter().all(|e| e.edge_type != EdgeType::RedirectsTo));
    }

    /// Refuses every node whose id starts with `ip:` and every finding.
    struct FlakyStore {
        inner: MemoryStore,
    }

    impl ReconStore for FlakyStore {
        fn upsert_node(&self, node: &GraphNode) -> Result<(), StoreError> {
            if node.node_id.starts_with("ip:") {
                return Err(StoreError::Unavailable("disk full".into()));
            }
            self.inner.upsert_node(node)
        }
        fn append_edge(&self, edge: &GraphEdge) -> Result<(), StoreError> {
            self.inner.append_edge(edge)
        }
        fn create_finding(&self, _finding: &Finding) -> Result<i64, StoreError> {
            Err(StoreError::Rejected("read-only".into()))
        }
        fn create_target(&self, session_id: SessionId, scan: &ScanResult) -> Result<TargetId, StoreError> {
            self.inner.create_target(session_id, scan)
        }
        fn update_target_risk(&self, target_id: TargetId, risk: RiskScore) -> Result<(), StoreError> {
            self.inner.update_target_risk(target_id, risk)
        }
    }

    #[test]
    fn store_failures_do_not_stop_sibling_writes() {
        let store = FlakyStore { inner: MemoryStore::new() };
        let outcome = GraphBuilder::new(&store, 1).build(&sample_scan());

        assert_eq!(outcome.failed_writes, 2);
        let ids = node_ids(&store.inner, 1);
        assert!(!ids.contains("ip:93.184.216.34"));
        assert!(ids.contains("path:www.example.com/admin"));
        assert!(ids.contains("port:www.example.com:3306"));
        assert_eq!(store.inner.graph(1).unwrap().links.len(), 8);
    }
}
