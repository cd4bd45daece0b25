// src/core/scanner/mod.rs

// Active probes. Each submodule owns one kind of network attempt; this file
// wires them together into a single `ScanResult` per target.
pub mod dns_scanner;
pub mod http_prober;
pub mod path_enumerator;
pub mod port_scanner;

use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::config::ScanOptions;
use crate::core::knowledge_base::{default_paths, default_ports};
use crate::core::models::{LivenessResult, NormalizedTarget, ScanResult, Scheme};
use crate::core::target::root_domain;

use self::dns_scanner::run_dns_scan;
use self::http_prober::HttpProber;
use self::path_enumerator::{enumerate_paths, parse_path_spec};
use self::port_scanner::{parse_port_spec, scan_ports};

/// Candidate ports from the options, or the well-known list when none are given.
pub fn candidate_ports(options: &ScanOptions) -> Vec<u16> {
    if options.ports.trim().is_empty() {
        default_ports()
    } else {
        parse_port_spec(&options.ports)
    }
}

/// Candidate paths from the options, or the built-in wordlist when none are given.
pub fn candidate_paths(options: &ScanOptions) -> Vec<String> {
    if options.paths.trim().is_empty() {
        default_paths()
    } else {
        parse_path_spec(&options.paths)
    }
}

/// Probes the target over its own scheme, then once over plain HTTP if an
/// HTTPS attempt got no answer.
async fn probe_liveness(prober: &HttpProber, target: &NormalizedTarget) -> Option<LivenessResult> {
    if let Some(result) = prober.probe(&target.base_url).await {
        return Some(result);
    }
    if target.scheme == Scheme::Https {
        let fallback = target.with_scheme(Scheme::Http);
        debug!(url = %fallback.base_url, "HTTPS unreachable, falling back to HTTP.");
        return prober.probe(&fallback.base_url).await;
    }
    None
}

/// Liveness probe followed by path enumeration against wherever the probe landed.
async fn run_http_scan(
    prober: &HttpProber,
    target: &NormalizedTarget,
    options: &ScanOptions,
) -> (Option<LivenessResult>, Vec<String>) {
    let liveness = if options.http_probe {
        probe_liveness(prober, target).await
    } else {
        None
    };

    if !options.dir_scan {
        return (liveness, Vec::new());
    }
    let base = liveness
        .as_ref()
        .map(|l| l.final_url.clone())
        .filter(|u| !u.is_empty())
        .unwrap_or_else(|| target.base_url.clone());
    let found = enumerate_paths(prober, &base, &candidate_paths(options), options.concurrency()).await;
    (liveness, found.into_iter().collect())
}

/// Runs every enabled probe against one normalized target and assembles the result.
///
/// DNS resolution, the port scan and the HTTP stage run concurrently. Path
/// enumeration waits for the liveness probe so it can start from the final
/// URL. Ports and paths come back sorted and deduplicated.
///
/// # Arguments
/// * `target` - The normalized target to probe.
/// * `prober` - Shared HTTP client for the liveness probe and path enumeration.
/// * `options` - Which probes to run and their candidate lists.
pub async fn run_full_scan(target: &NormalizedTarget, prober: &HttpProber, options: &ScanOptions) -> ScanResult {
    info!(url = %target.base_url, "Starting full scan.");
    let timeout = options.timeout();

    let port_scan = async {
        if options.port_scan {
            scan_ports(&target.host, &candidate_ports(options), timeout, options.concurrency()).await
        } else {
            BTreeMap::new()
        }
    };

    let (dns, open_ports, (liveness, found_paths)) = tokio::join!(
        run_dns_scan(&target.host, timeout),
        port_scan,
        run_http_scan(prober, target, options)
    );

    let mut result = ScanResult::new(root_domain(&target.host), target.host.clone());
    result.ips = dns.ips;
    result.dns_meta = dns.dns_meta;
    result.ports = open_ports.keys().copied().collect();
    result.port_detail = open_ports;
    result.alive = liveness.into_iter().collect();
    result.dirb = found_paths.into_iter().collect();

    info!(
        url = %target.base_url,
        ips = result.ips.len(),
        ports = result.ports.len(),
        alive = result.alive.len(),
        paths = result.dirb.len(),
        "Full scan finished."
    );
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::target::normalize_target;
    use std::time::Duration;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn empty_specs_select_defaults() {
        let options = ScanOptions::default();
        assert_eq!(candidate_ports(&options), default_ports());
        assert_eq!(candidate_paths(&options), default_paths());
    }

    #[test]
    fn explicit_specs_override_defaults() {
        let options = ScanOptions {
            ports: "443,8000-8001".into(),
            paths: "admin".into(),
            ..Default::default()
        };
        assert_eq!(candidate_ports(&options), vec![443, 8000, 8001]);
        assert_eq!(candidate_paths(&options), vec!["/admin".to_string()]);
    }

    #[tokio::test]
    async fn https_failure_falls_back_to_plain_http() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        let port = server.address().port();

        let target = normalize_target(&format!("127.0.0.1:{port}")).unwrap();
        assert_eq!(target.scheme, Scheme::Https);

        let prober = HttpProber::new(Duration::from_secs(2), 5).unwrap();
        let result = probe_liveness(&prober, &target).await.unwrap();
        assert_eq!(result.requested_url, format!("http://127.0.0.1:{port}"));
        assert_eq!(result.final_status, 200);
    }

    #[tokio::test]
    async fn plain_http_target_gets_no_second_attempt() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let target = normalize_target(&format!("http://127.0.0.1:{port}")).unwrap();
        let prober = HttpProber::new(Duration::from_secs(1), 5).unwrap();
        assert!(probe_liveness(&prober, &target).await.is_none());
    }
}
