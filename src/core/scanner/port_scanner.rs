// src/core/scanner/port_scanner.rs

use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

use futures::stream::{self, StreamExt};
use once_cell::sync::Lazy;
use regex::Regex;
use tokio::net::TcpStream;
use tracing::{debug, info};

use crate::core::knowledge_base::service_label;

/// One token of a port spec: a single port or an inclusive `a-b` range.
static RE_PORT_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d+)\s*(?:-\s*(\d+))?$").unwrap());

/// Deduplicates candidate ports, keeping first-seen order and dropping anything outside `1..=65535`.
pub fn normalize_ports<I>(ports: I) -> Vec<u16>
where
    I: IntoIterator<Item = u32>,
{
    let mut seen = HashSet::new();
    ports
        .into_iter()
        .filter(|p| (1..=65535).contains(p))
        .map(|p| p as u16)
        .filter(|p| seen.insert(*p))
        .collect()
}

/// Parses a compact port spec such as `"22,80,8000-8010"`.
///
/// Ranges are inclusive and swapped when written backwards. Malformed tokens
/// are dropped rather than failing the whole spec.
pub fn parse_port_spec(spec: &str) -> Vec<u16> {
    let mut candidates: Vec<u32> = Vec::new();
    for token in spec.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        let Some(caps) = RE_PORT_TOKEN.captures(token) else {
            debug!(token, "Dropping malformed port token.");
            continue;
        };
        let Ok(start) = caps[1].parse::<u32>() else {
            debug!(token, "Dropping out-of-range port token.");
            continue;
        };
        let end = match caps.get(2).map(|m| m.as_str().parse::<u32>()) {
            None => start,
            Some(Ok(end)) => end,
            Some(Err(_)) => {
                debug!(token, "Dropping out-of-range port token.");
                continue;
            }
        };
        let (lo, hi) = if start <= end { (start, end) } else { (end, start) };
        candidates.extend(lo.max(1)..=hi.min(65535));
    }
    normalize_ports(candidates)
}

/// Attempts one TCP connect. `true` only when the handshake completes within `timeout`.
async fn probe_port(host: &str, port: u16, timeout: Duration) -> bool {
    match tokio::time::timeout(timeout, TcpStream::connect((host, port))).await {
        Ok(Ok(_)) => {
            debug!(host, port, "Port open.");
            true
        }
        Ok(Err(e)) => {
            debug!(host, port, error = %e, "Port closed.");
            false
        }
        Err(_) => {
            debug!(host, port, "Port filtered (timeout).");
            false
        }
    }
}

/// Connect-scans `ports` on `host` and labels each open one with its usual service.
///
/// Closed, refused and timed-out ports are simply absent from the result.
/// At most `concurrency` attempts are in flight; the returned map is ordered by port.
pub async fn scan_ports(host: &str, ports: &[u16], timeout: Duration, concurrency: usize) -> BTreeMap<u16, String> {
    if ports.is_empty() {
        return BTreeMap::new();
    }
    info!(host, candidates = ports.len(), "Starting port scan.");

    let open: Vec<u16> = stream::iter(ports.iter().copied())
        .map(|port| async move { probe_port(host, port, timeout).await.then_some(port) })
        .buffer_unordered(concurrency.max(1))
        .filter_map(|port| async move { port })
        .collect()
        .await;

    let result: BTreeMap<u16, String> = open
        .into_iter()
        .map(|port| (port, service_label(port).to_string()))
        .collect();
    info!(host, open = result.len(), "Port scan finished.");
    result
}
