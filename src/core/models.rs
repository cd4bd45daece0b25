// src/core/models.rs

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{AsRefStr, Display, EnumString};

/// Opaque identifier of a recon session, owned by the surrounding service.
pub type SessionId = i64;

/// Opaque identifier handed back by the store when a per-target record is created.
pub type TargetId = i64;

/// Returns an empty JSON object, the neutral value for pass-through payloads.
pub fn empty_object() -> Value {
    Value::Object(serde_json::Map::new())
}

// --- Target ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Scheme {
    Http,
    Https,
}

/// A user-supplied host or URL reduced to the parts the probes need.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedTarget {
    pub raw: String,
    /// Hostname or literal IP, without IPv6 brackets.
    pub host: String,
    pub scheme: Scheme,
    pub port: Option<u16>,
    pub base_url: String,
}

impl NormalizedTarget {
    /// Same host and port, served over another scheme.
    pub fn with_scheme(&self, scheme: Scheme) -> Self {
        Self {
            raw: self.raw.clone(),
            host: self.host.clone(),
            scheme,
            port: self.port,
            base_url: build_base_url(scheme, &self.host, self.port),
        }
    }
}

pub(crate) fn build_base_url(scheme: Scheme, host: &str, port: Option<u16>) -> String {
    let host_part = if host.contains(':') {
        format!("[{host}]")
    } else {
        host.to_string()
    };
    match port {
        Some(p) => format!("{scheme}://{host_part}:{p}"),
        None => format!("{scheme}://{host_part}"),
    }
}

// --- Risk ---

/// Heuristic exposure score, always within `0..=100`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RiskScore(u8);

impl RiskScore {
    pub const MIN: RiskScore = RiskScore(0);
    pub const MAX: RiskScore = RiskScore(100);

    /// Clamps an arbitrary sum of weights into the valid range.
    pub fn clamped(raw: i64) -> Self {
        Self(raw.clamp(0, 100) as u8)
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl fmt::Display for RiskScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// --- Scan Results ---

/// Outcome of one liveness probe, including the redirect hops that were followed.
///
/// The serialized field names match the recon import document
/// (`url`, `status`, `server`, `chain_status_codes`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LivenessResult {
    #[serde(rename = "url", default)]
    pub requested_url: String,
    #[serde(default)]
    pub final_url: String,
    #[serde(rename = "status", default)]
    pub final_status: u16,
    #[serde(rename = "server", default)]
    pub server_header: String,
    #[serde(rename = "chain_status_codes", default)]
    pub redirect_chain: Vec<u16>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub cdn_name: String,
}

/// Everything known about one target host after probing or import.
///
/// Transient: it is scored and translated into graph writes, never stored itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    pub root_domain: String,
    pub domain: String,
    pub ips: BTreeSet<String>,
    pub ports: BTreeSet<u16>,
    pub port_detail: BTreeMap<u16, String>,
    pub dns_meta: Value,
    pub alive: Vec<LivenessResult>,
    pub dirb: BTreeSet<String>,
    pub infra: Value,
}

impl ScanResult {
    pub fn new(root_domain: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            root_domain: root_domain.into(),
            domain: domain.into(),
            ips: BTreeSet::new(),
            ports: BTreeSet::new(),
            port_detail: BTreeMap::new(),
            dns_meta: empty_object(),
            alive: Vec::new(),
            dirb: BTreeSet::new(),
            infra: empty_object(),
        }
    }

    /// Label recorded for an open port, or `"unknown"` when nothing was captured.
    pub fn service_for(&self, port: u16) -> &str {
        self.port_detail.get(&port).map(String::as_str).unwrap_or("unknown")
    }

    /// PTR names carried in `dns_meta.ptr.values`, if any.
    pub fn ptr_values(&self) -> Value {
        self.dns_meta
            .get("ptr")
            .and_then(|ptr| ptr.get("values"))
            .cloned()
            .unwrap_or_else(|| Value::Array(Vec::new()))
    }

    pub fn is_cloud_hosted(&self) -> bool {
        self.infra.get("type").and_then(Value::as_str) == Some("cloud")
    }
}

// --- Graph ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum NodeType {
    Domain,
    Subdomain,
    Ip,
    Port,
    Url,
    Path,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EdgeType {
    HasSubdomain,
    ResolvesTo,
    Exposes,
    Serves,
    RedirectsTo,
    Contains,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// A graph vertex. `(session_id, node_id)` is its key; writing the same key again replaces it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub session_id: SessionId,
    pub node_id: String,
    pub node_type: NodeType,
    pub label: String,
    pub attributes: Value,
    pub risk_score: RiskScore,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
}

/// A directed relation between two nodes. Edges are appended, never deduplicated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub session_id: SessionId,
    pub source_node_id: String,
    pub target_node_id: String,
    pub edge_type: EdgeType,
    pub label: String,
    pub attributes: Value,
}

// --- Findings ---

/// Finding severity. Variants are declared most urgent first, so the derived
/// ordering sorts CRITICAL before INFO.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
    Info,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum FindingStatus {
    #[default]
    Open,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub session_id: SessionId,
    pub title: String,
    pub severity: Severity,
    pub category: String,
    pub detail: String,
    pub recommendation: String,
    pub endpoint: String,
    #[serde(default)]
    pub status: FindingStatus,
}
