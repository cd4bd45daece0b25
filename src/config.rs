// src/config.rs

use std::path::Path;
use std::time::Duration;

use color_eyre::eyre::{Result, WrapErr};
use serde::{Deserialize, Serialize};

/// Options for an active scan.
///
/// Deserializes from the same JSON shape the ingest endpoint accepts:
/// `{"port_scan": true, "dir_scan": true, "http_probe": true, "timeout": 3,
/// "ports": "22,80,8000-8100", "paths": "/admin,/.git"}`.
/// Empty `ports` or `paths` select the built-in lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanOptions {
    pub port_scan: bool,
    pub dir_scan: bool,
    pub http_probe: bool,
    /// Per-attempt timeout in seconds.
    pub timeout: f64,
    pub ports: String,
    pub paths: String,
    pub max_redirects: usize,
    /// Upper bound on probes in flight at once, per probe kind.
    pub concurrency: usize,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            port_scan: true,
            dir_scan: true,
            http_probe: true,
            timeout: 3.0,
            ports: String::new(),
            paths: String::new(),
            max_redirects: 5,
            concurrency: 32,
        }
    }
}

impl ScanOptions {
    /// The timeout as a `Duration`. Non-finite or negative values fall back to the default.
    pub fn timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.timeout)
            .ok()
            .filter(|d| !d.is_zero())
            .unwrap_or(Duration::from_secs(3))
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency.max(1)
    }

    /// Reads options from a JSON file. Missing fields keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("reading scan options from {}", path.display()))?;
        serde_json::from_str(&raw).wrap_err("parsing scan options")
    }
}
