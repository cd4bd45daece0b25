// src/lib.rs

//! Reconnaissance asset graph: probes a target (ports, HTTP liveness,
//! discoverable paths) or imports a recon document, scores what it finds and
//! writes a typed graph plus findings through a pluggable store.

pub mod config;
pub mod core;
pub mod logging;

pub use crate::config::ScanOptions;
pub use crate::core::error::ReconError;
pub use crate::core::graph::{BuildOutcome, GraphBuilder};
pub use crate::core::ingest::{import_document, parse_document, scan_and_ingest, IngestSummary};
pub use crate::core::models::{
    Finding, GraphEdge, GraphNode, LivenessResult, NormalizedTarget, RiskScore, ScanResult, Severity,
};
pub use crate::core::store::{MemoryStore, ReconStore, StoreError};
