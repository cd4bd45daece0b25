// src/core/store.rs

//! The persistence contract the graph builder writes through, plus an
//! in-memory implementation used by the CLI and the tests.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::core::models::{
    Finding, GraphEdge, GraphNode, Position, RiskScore, ScanResult, SessionId, TargetId,
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("unknown target id {0}")]
    UnknownTarget(TargetId),

    #[error("write rejected: {0}")]
    Rejected(String),
}

/// Writes the recon core performs. Implemented by whatever persistence layer
/// surrounds it.
///
/// Implementations take `&self` and handle their own synchronization so one
/// store can be shared between concurrent ingests.
pub trait ReconStore: Send + Sync {
    /// Inserts the node, or replaces the node already stored under
    /// `(node.session_id, node.node_id)`.
    fn upsert_node(&self, node: &GraphNode) -> Result<(), StoreError>;

    /// Appends the edge. No deduplication.
    fn append_edge(&self, edge: &GraphEdge) -> Result<(), StoreError>;

    /// Appends a finding and returns its identifier.
    fn create_finding(&self, finding: &Finding) -> Result<i64, StoreError>;

    /// Records the facts gathered for one target host.
    fn create_target(&self, session_id: SessionId, scan: &ScanResult) -> Result<TargetId, StoreError>;

    fn update_target_risk(&self, target_id: TargetId, risk_score: RiskScore) -> Result<(), StoreError>;
}

// --- In-memory store ---

#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub id: SessionId,
    pub name: String,
    pub target_url: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StoredFinding {
    pub id: i64,
    #[serde(flatten)]
    pub finding: Finding,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StoredTarget {
    pub id: TargetId,
    pub session_id: SessionId,
    #[serde(flatten)]
    pub scan: ScanResult,
    pub risk_score: RiskScore,
    pub created_at: DateTime<Utc>,
}

/// Snapshot of one session's graph, shaped for force-directed renderers.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Graph {
    pub nodes: Vec<GraphNode>,
    pub links: Vec<GraphEdge>,
}

#[derive(Debug, Default)]
struct Inner {
    last_id: i64,
    sessions: BTreeMap<SessionId, Session>,
    nodes: BTreeMap<(SessionId, String), GraphNode>,
    edges: Vec<GraphEdge>,
    findings: Vec<StoredFinding>,
    targets: BTreeMap<TargetId, StoredTarget>,
}

impl Inner {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, StoreError> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }

    pub fn create_session(&self, name: &str, target_url: &str) -> Result<SessionId, StoreError> {
        let mut inner = self.lock()?;
        let id = inner.next_id();
        inner.sessions.insert(
            id,
            Session {
                id,
                name: name.to_string(),
                target_url: target_url.to_string(),
                status: "idle".to_string(),
                created_at: Utc::now(),
            },
        );
        debug!(session_id = id, name, "Session created.");
        Ok(id)
    }

    pub fn session(&self, id: SessionId) -> Result<Option<Session>, StoreError> {
        Ok(self.lock()?.sessions.get(&id).cloned())
    }

    pub fn set_session_status(&self, id: SessionId, status: &str) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        match inner.sessions.get_mut(&id) {
            Some(session) => {
                session.status = status.to_string();
                Ok(())
            }
            None => Err(StoreError::Rejected(format!("unknown session id {id}"))),
        }
    }

    pub fn graph(&self, session_id: SessionId) -> Result<Graph, StoreError> {
        let inner = self.lock()?;
        Ok(Graph {
            nodes: inner
                .nodes
                .values()
                .filter(|n| n.session_id == session_id)
                .cloned()
                .collect(),
            links: inner
                .edges
                .iter()
                .filter(|e| e.session_id == session_id)
                .cloned()
                .collect(),
        })
    }

    /// Pins a node where a renderer placed it. Later upserts of the same key keep it.
    pub fn set_node_position(&self, session_id: SessionId, node_id: &str, position: Position) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        match inner.nodes.get_mut(&(session_id, node_id.to_string())) {
            Some(node) => {
                node.position = Some(position);
                Ok(())
            }
            None => Err(StoreError::Rejected(format!("unknown node {node_id} in session {session_id}"))),
        }
    }

    /// Removes every node and edge of the session. Findings and targets stay.
    pub fn clear_graph(&self, session_id: SessionId) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        inner.nodes.retain(|(sid, _), _| *sid != session_id);
        inner.edges.retain(|e| e.session_id != session_id);
        Ok(())
    }

    /// Findings of the session, most severe first.
    pub fn findings(&self, session_id: SessionId) -> Result<Vec<StoredFinding>, StoreError> {
        let inner = self.lock()?;
        let mut findings: Vec<StoredFinding> = inner
            .findings
            .iter()
            .filter(|f| f.finding.session_id == session_id)
            .cloned()
            .collect();
        findings.sort_by_key(|f| f.finding.severity);
        Ok(findings)
    }

    /// Targets of the session, riskiest first.
    pub fn targets(&self, session_id: SessionId) -> Result<Vec<StoredTarget>, StoreError> {
        let inner = self.lock()?;
        let mut targets: Vec<StoredTarget> = inner
            .targets
            .values()
            .filter(|t| t.session_id == session_id)
            .cloned()
            .collect();
        targets.sort_by(|a, b| b.risk_score.cmp(&a.risk_score));
        Ok(targets)
    }
}

impl ReconStore for MemoryStore {
    fn upsert_node(&self, node: &GraphNode) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        let key = (node.session_id, node.node_id.clone());
        let mut node = node.clone();
        if node.position.is_none() {
            node.position = inner.nodes.get(&key).and_then(|old| old.position);
        }
        inner.nodes.insert(key, node);
        Ok(())
    }

    fn append_edge(&self, edge: &GraphEdge) -> Result<(), StoreError> {
        self.lock()?.edges.push(edge.clone());
        Ok(())
    }

    fn create_finding(&self, finding: &Finding) -> Result<i64, StoreError> {
        let mut inner = self.lock()?;
        let id = inner.next_id();
        inner.findings.push(StoredFinding {
            id,
            finding: finding.clone(),
            created_at: Utc::now(),
        });
        Ok(id)
    }

    fn create_target(&self, session_id: SessionId, scan: &ScanResult) -> Result<TargetId, StoreError> {
        let mut inner = self.lock()?;
        let id = inner.next_id();
        inner.targets.insert(
            id,
            StoredTarget {
                id,
                session_id,
                scan: scan.clone(),
                risk_score: RiskScore::MIN,
                created_at: Utc::now(),
            },
        );
        Ok(id)
    }

    fn update_target_risk(&self, target_id: TargetId, risk_score: RiskScore) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        let target = inner
            .targets
            .get_mut(&target_id)
            .ok_or(StoreError::UnknownTarget(target_id))?;
        target.risk_score = risk_score;
        Ok(())
    }
}
