// tests/ingest_pipeline.rs

use std::collections::BTreeSet;

use serde_json::json;
use tokio::net::TcpListener;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use recon_graph::core::models::{EdgeType, NodeType};
use recon_graph::core::store::Graph;
use recon_graph::{
    import_document, scan_and_ingest, GraphBuilder, LivenessResult, MemoryStore, ScanOptions, ScanResult, Severity,
};

fn node_ids(graph: &Graph) -> BTreeSet<String> {
    graph.nodes.iter().map(|n| n.node_id.clone()).collect()
}

fn edge_types(graph: &Graph) -> Vec<EdgeType> {
    let mut types: Vec<EdgeType> = graph.links.iter().map(|e| e.edge_type).collect();
    types.sort_by_key(|t| t.to_string());
    types
}

#[test]
fn minimal_import_produces_domain_subdomain_and_ip() {
    let store = MemoryStore::new();
    let sid = store.create_session("acme", "acme.io").unwrap();
    let doc = json!({
        "root_domain": "acme.io",
        "targets": [{ "domain": "www.acme.io", "ips": ["1.2.3.4"] }]
    });

    let summary = import_document(&store, sid, &doc).unwrap();
    assert_eq!(summary.targets_processed, 1);

    let graph = store.graph(sid).unwrap();
    let expected: BTreeSet<String> = ["domain:acme.io", "domain:www.acme.io", "ip:1.2.3.4"]
        .into_iter()
        .map(String::from)
        .collect();
    assert_eq!(node_ids(&graph), expected);
    assert_eq!(edge_types(&graph), vec![EdgeType::HasSubdomain, EdgeType::ResolvesTo]);
}

#[test]
fn import_and_direct_build_converge() {
    let doc = json!({
        "root_domain": "example.com",
        "targets": [{
            "domain": "example.com",
            "ips": ["93.184.216.34"],
            "ports": [3306, 80],
            "port_detail": { "80": "http", "3306": "mysql 5.7" },
            "alive": [{ "url": "http://example.com", "final_url": "https://example.com/", "status": 200, "chain_status_codes": [301] }],
            "dirb": ["/admin"]
        }]
    });
    let imported = MemoryStore::new();
    import_document(&imported, 1, &doc).unwrap();

    let mut scan = ScanResult::new("example.com", "example.com");
    scan.ips.insert("93.184.216.34".into());
    scan.ports.extend([80, 3306]);
    scan.port_detail.insert(80, "http".into());
    scan.port_detail.insert(3306, "mysql 5.7".into());
    scan.alive.push(LivenessResult {
        requested_url: "http://example.com".into(),
        final_url: "https://example.com/".into(),
        final_status: 200,
        server_header: String::new(),
        redirect_chain: vec![301],
        cdn_name: String::new(),
    });
    scan.dirb.insert("/admin".into());
    let built = MemoryStore::new();
    let outcome = GraphBuilder::new(&built, 1).build(&scan);

    let (a, b) = (imported.graph(1).unwrap(), built.graph(1).unwrap());
    assert_eq!(a.nodes, b.nodes);
    assert_eq!(a.links, b.links);

    assert_eq!(outcome.risk_score.value(), 41);
    let findings = built.findings(1).unwrap();
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].finding.severity, Severity::High);
    assert_eq!(findings[0].finding.endpoint, "example.com/admin");
    assert_eq!(built.targets(1).unwrap()[0].risk_score.value(), 41);
}

#[test]
fn malformed_document_writes_nothing() {
    let store = MemoryStore::new();
    let doc = json!({
        "root_domain": "acme.io",
        "targets": [
            { "domain": "ok.acme.io", "ips": ["1.1.1.1"] },
            { "domain": "bad.acme.io", "ips": "1.1.1.2" }
        ]
    });
    assert!(import_document(&store, 1, &doc).is_err());
    let graph = store.graph(1).unwrap();
    assert!(graph.nodes.is_empty() && graph.links.is_empty());
}

#[test]
fn reimport_keeps_node_set_stable() {
    let store = MemoryStore::new();
    let doc = json!({
        "root_domain": "acme.io",
        "targets": [{ "domain": "www.acme.io", "ips": ["1.2.3.4"], "ports": [22], "dirb": ["/.git"] }]
    });
    import_document(&store, 9, &doc).unwrap();
    let first = store.graph(9).unwrap();
    import_document(&store, 9, &doc).unwrap();
    let second = store.graph(9).unwrap();

    assert_eq!(node_ids(&first), node_ids(&second));
    assert_eq!(second.nodes.len(), first.nodes.len());
    assert_eq!(second.links.len(), first.links.len() * 2);
    assert_eq!(store.findings(9).unwrap().len(), 2);
}

#[tokio::test]
async fn active_scan_feeds_the_same_builder() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).insert_header("server", "Apache 2.4.49"))
        .mount(&server)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/admin"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let web_port = server.address().port();
    let extra = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let extra_port = extra.local_addr().unwrap().port();

    let options = ScanOptions {
        ports: format!("{web_port},{extra_port}"),
        paths: "/admin,/nothing-here".into(),
        timeout: 1.0,
        ..Default::default()
    };
    let store = MemoryStore::new();
    let targets = vec![server.uri(), "   ".to_string()];
    let summary = scan_and_ingest(&store, 4, &targets, &options).await.unwrap();

    assert_eq!(summary.targets_processed, 1);
    assert_eq!(summary.rejected.len(), 1);
    assert_eq!(summary.findings_created, 1);

    let graph = store.graph(4).unwrap();
    let ids = node_ids(&graph);
    assert!(ids.contains("domain:127.0.0.1"));
    assert!(ids.contains("ip:127.0.0.1"));
    assert!(ids.contains(&format!("port:127.0.0.1:{web_port}")));
    assert!(ids.contains(&format!("port:127.0.0.1:{extra_port}")));
    assert!(ids.contains(&format!("url:{}", server.uri())));
    assert!(ids.contains("path:127.0.0.1/admin"));
    assert!(!ids.contains("path:127.0.0.1/nothing-here"));
    assert!(graph.links.iter().all(|e| e.edge_type != EdgeType::RedirectsTo));

    let url_node = graph.nodes.iter().find(|n| n.node_type == NodeType::Url).unwrap();
    assert_eq!(url_node.attributes["server"], "Apache 2.4.49");
    assert_eq!(url_node.attributes["status"], 200);

    let findings = store.findings(4).unwrap();
    assert_eq!(findings[0].finding.severity, Severity::High);
    assert_eq!(findings[0].finding.endpoint, "127.0.0.1/admin");
    drop(extra);
}

#[tokio::test]
async fn disabled_probes_still_record_target() {
    let options = ScanOptions {
        port_scan: false,
        dir_scan: false,
        http_probe: false,
        timeout: 0.5,
        ..Default::default()
    };
    let store = MemoryStore::new();
    let summary = scan_and_ingest(&store, 2, &["10.255.255.1".to_string()], &options).await.unwrap();
    assert_eq!(summary.targets_processed, 1);

    let graph = store.graph(2).unwrap();
    assert!(graph.nodes.iter().all(|n| n.node_type != NodeType::Port && n.node_type != NodeType::Url));
    assert_eq!(store.targets(2).unwrap().len(), 1);
}
