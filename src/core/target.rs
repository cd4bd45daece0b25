// src/core/target.rs

use std::net::IpAddr;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;
use url::Url;

use crate::core::error::ReconError;
use crate::core::models::{build_base_url, NormalizedTarget, Scheme};

/// A leading `scheme://`. A `://` further into the string (e.g. in a query) does not count.
static RE_LEADING_SCHEME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.-]*://").unwrap());

/// Parses a raw host or URL into a [`NormalizedTarget`].
///
/// A string without a scheme is treated as `https://`. Any scheme other than
/// `http` becomes `https`. An explicit port is kept unless it is the scheme default.
///
/// # Errors
/// Returns [`ReconError::InvalidTarget`] when no hostname can be extracted.
pub fn normalize_target(raw: &str) -> Result<NormalizedTarget, ReconError> {
    let trimmed = raw.trim();
    let with_scheme = if RE_LEADING_SCHEME.is_match(trimmed) {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };

    let url = Url::parse(&with_scheme)
        .map_err(|e| ReconError::invalid_target(format!("{raw:?}: {e}")))?;

    let host = url
        .host_str()
        .map(|h| h.trim_start_matches('[').trim_end_matches(']').to_string())
        .filter(|h| !h.is_empty())
        .ok_or_else(|| ReconError::invalid_target(format!("{raw:?}: empty hostname")))?;

    let scheme = match url.scheme() {
        "http" => Scheme::Http,
        _ => Scheme::Https,
    };
    let port = url.port();

    debug!(raw, host = %host, scheme = %scheme, ?port, "Normalized target.");
    Ok(NormalizedTarget {
        raw: raw.to_string(),
        base_url: build_base_url(scheme, &host, port),
        host,
        scheme,
        port,
    })
}

/// Registrable-domain guess: the last two DNS labels, or the host itself for IP literals.
pub fn root_domain(host: &str) -> String {
    let host = host.trim_end_matches('.');
    if host.parse::<IpAddr>().is_ok() {
        return host.to_string();
    }
    let labels: Vec<&str> = host.split('.').filter(|l| !l.is_empty()).collect();
    if labels.len() <= 2 {
        return host.to_string();
    }
    labels[labels.len() - 2..].join(".")
}
