// src/core/ingest.rs

//! The two ways recon data enters the graph: importing a previously assembled
//! document, or scanning raw targets. Both produce [`ScanResult`]s and hand
//! them to the same [`GraphBuilder`].

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::config::ScanOptions;
use crate::core::error::ReconError;
use crate::core::graph::GraphBuilder;
use crate::core::models::{empty_object, LivenessResult, ScanResult, SessionId};
use crate::core::scanner::http_prober::HttpProber;
use crate::core::scanner::run_full_scan;
use crate::core::store::ReconStore;
use crate::core::target::normalize_target;

/// What an ingest pass did, reported back to the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestSummary {
    pub targets_processed: usize,
    pub findings_created: usize,
    pub failed_writes: usize,
    /// Raw targets that could not be normalized, with the reason.
    pub rejected: Vec<(String, String)>,
}

fn default_root_domain() -> String {
    "unknown".to_string()
}

#[derive(Debug, Deserialize)]
struct ReconDocument {
    #[serde(default = "default_root_domain")]
    root_domain: String,
    targets: Vec<ImportedTarget>,
}

#[derive(Debug, Deserialize)]
struct ImportedTarget {
    #[serde(default)]
    domain: String,
    #[serde(default)]
    ips: Vec<String>,
    #[serde(default)]
    ports: Vec<u16>,
    #[serde(default)]
    port_detail: BTreeMap<String, Value>,
    #[serde(default = "empty_object")]
    dns_meta: Value,
    #[serde(default)]
    alive: Vec<LivenessResult>,
    #[serde(default)]
    dirb: Vec<String>,
    #[serde(default = "empty_object")]
    infra: Value,
}

impl ImportedTarget {
    fn into_scan_result(self, root_domain: &str) -> Result<ScanResult, ReconError> {
        let mut port_detail = BTreeMap::new();
        for (key, value) in self.port_detail {
            let port: u16 = key
                .trim()
                .parse()
                .map_err(|_| ReconError::malformed(format!("port_detail key {key:?} of {} is not a port", self.domain)))?;
            let label = match value {
                Value::String(s) => s,
                other => other.to_string(),
            };
            port_detail.insert(port, label);
        }

        let mut result = ScanResult::new(root_domain.trim(), self.domain.trim());
        result.ips = self.ips.into_iter().collect();
        result.ports = self.ports.into_iter().filter(|p| *p != 0).collect();
        result.port_detail = port_detail;
        result.dns_meta = self.dns_meta;
        result.alive = self.alive;
        result.dirb = self
            .dirb
            .into_iter()
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect::<BTreeSet<_>>();
        result.infra = self.infra;
        Ok(result)
    }
}

/// Validates a recon document and converts it into one [`ScanResult`] per target.
///
/// The document may be a JSON object or a string holding JSON. Targets with an
/// empty `domain` are skipped.
///
/// # Errors
/// [`ReconError::MalformedImportDocument`] if any part of the document has the
/// wrong shape. In that case nothing from the document is returned.
pub fn parse_document(document: &Value) -> Result<Vec<ScanResult>, ReconError> {
    if let Value::String(raw) = document {
        let inner: Value = serde_json::from_str(raw).map_err(|e| ReconError::malformed(format!("invalid JSON: {e}")))?;
        if inner.is_string() {
            return Err(ReconError::malformed("document is a JSON string, expected an object"));
        }
        return parse_document(&inner);
    }

    let doc: ReconDocument =
        serde_json::from_value(document.clone()).map_err(|e| ReconError::malformed(e.to_string()))?;
    let root = doc.root_domain;
    doc.targets
        .into_iter()
        .filter(|t| !t.domain.trim().is_empty())
        .map(|t| t.into_scan_result(&root))
        .collect()
}

fn ingest_scan<S: ReconStore + ?Sized>(builder: &GraphBuilder<'_, S>, scan: &ScanResult, summary: &mut IngestSummary) {
    let outcome = builder.build(scan);
    summary.targets_processed += 1;
    summary.findings_created += outcome.findings_created;
    summary.failed_writes += outcome.failed_writes;
}

/// Imports a recon document into the session's graph.
///
/// The whole document is validated before the first write.
pub fn import_document<S: ReconStore + ?Sized>(
    store: &S,
    session_id: SessionId,
    document: &Value,
) -> Result<IngestSummary, ReconError> {
    let scans = parse_document(document)?;
    info!(session_id, targets = scans.len(), "Importing recon document.");

    let builder = GraphBuilder::new(store, session_id);
    let mut summary = IngestSummary::default();
    for scan in &scans {
        ingest_scan(&builder, scan, &mut summary);
    }
    info!(session_id, processed = summary.targets_processed, findings = summary.findings_created, "Import finished.");
    Ok(summary)
}

/// Scans each raw target and ingests the results into the session's graph.
///
/// Targets are processed one after another. A target that cannot be
/// normalized is recorded in [`IngestSummary::rejected`] and the rest continue.
///
/// # Errors
/// Only fails if the HTTP client cannot be constructed.
pub async fn scan_and_ingest<S: ReconStore + ?Sized>(
    store: &S,
    session_id: SessionId,
    raw_targets: &[String],
    options: &ScanOptions,
) -> Result<IngestSummary, ReconError> {
    let prober = HttpProber::new(options.timeout(), options.max_redirects)?;
    let builder = GraphBuilder::new(store, session_id);
    let mut summary = IngestSummary::default();

    for raw in raw_targets {
        let target = match normalize_target(raw) {
            Ok(t) => t,
            Err(e) => {
                warn!(raw = %raw, error = %e, "Rejecting target.");
                summary.rejected.push((raw.clone(), e.to_string()));
                continue;
            }
        };
        let scan = run_full_scan(&target, &prober, options).await;
        ingest_scan(&builder, &scan, &mut summary);
    }

    info!(
        session_id,
        processed = summary.targets_processed,
        rejected = summary.rejected.len(),
        findings = summary.findings_created,
        "Scan ingest finished."
    );
    Ok(summary)
}
