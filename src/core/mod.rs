// src/core/mod.rs

// The recon pipeline: normalize a target, probe it, score what was found and
// translate it into graph writes through an injected store.

/// Data structures shared by every stage: targets, scan results, graph
/// elements and findings.
pub mod models;

/// Error taxonomy reported to callers.
pub mod error;

/// Parsing of user-supplied hosts and URLs.
pub mod target;

/// Active probes: DNS, TCP ports, HTTP liveness and path enumeration.
pub mod scanner;

/// Static tables of services, default wordlists and finding templates.
pub mod knowledge_base;

/// Pure risk-scoring functions.
pub mod risk;

/// Translation of scan results into nodes, edges and findings.
pub mod graph;

/// Persistence contract plus an in-memory implementation.
pub mod store;

/// Import and scan entry points.
pub mod ingest;
