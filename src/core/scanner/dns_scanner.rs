// src/core/scanner/dns_scanner.rs

use std::collections::BTreeSet;
use std::net::IpAddr;
use std::time::Duration;

use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::TokioAsyncResolver;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

/// Addresses of a host plus the reverse-DNS metadata gathered for them.
#[derive(Debug, Clone, PartialEq)]
pub struct DnsResolution {
    pub ips: BTreeSet<String>,
    /// `{"ptr": {"values": [...]}}`, passed through to the graph untouched.
    pub dns_meta: Value,
}

/// Resolves `host` to its A/AAAA addresses and looks up PTR names for each.
///
/// A literal IP skips the forward lookup. Lookup failures are logged and
/// leave the corresponding part empty; they never fail the scan.
///
/// # Arguments
/// * `host` - Hostname or IP literal, without brackets.
/// * `timeout` - Per-query timeout. Each query is attempted once.
pub async fn run_dns_scan(host: &str, timeout: Duration) -> DnsResolution {
    info!(host, "Starting DNS resolution.");

    let mut opts = ResolverOpts::default();
    opts.timeout = timeout;
    opts.attempts = 1;
    let resolver = TokioAsyncResolver::tokio(ResolverConfig::default(), opts);

    let ips: BTreeSet<IpAddr> = match host.parse::<IpAddr>() {
        Ok(ip) => BTreeSet::from([ip]),
        Err(_) => lookup_addresses(&resolver, host).await,
    };

    let mut ptr_values = BTreeSet::new();
    for ip in &ips {
        ptr_values.extend(lookup_ptr(&resolver, *ip).await);
    }

    info!(host, addresses = ips.len(), ptr = ptr_values.len(), "DNS resolution finished.");
    DnsResolution {
        ips: ips.iter().map(IpAddr::to_string).collect(),
        dns_meta: json!({ "ptr": { "values": ptr_values } }),
    }
}

async fn lookup_addresses(resolver: &TokioAsyncResolver, host: &str) -> BTreeSet<IpAddr> {
    debug!(host, "Looking up A/AAAA records.");
    match resolver.lookup_ip(host).await {
        Ok(lookup) => lookup.iter().collect(),
        Err(e) => {
            warn!(host, error = %e, "Address lookup failed.");
            BTreeSet::new()
        }
    }
}

async fn lookup_ptr(resolver: &TokioAsyncResolver, ip: IpAddr) -> Vec<String> {
    debug!(%ip, "Looking up PTR records.");
    match resolver.reverse_lookup(ip).await {
        Ok(lookup) => lookup
            .iter()
            .map(|name| name.to_string().trim_end_matches('.').to_string())
            .collect(),
        Err(e) => {
            debug!(%ip, error = %e, "PTR lookup failed.");
            Vec::new()
        }
    }
}
