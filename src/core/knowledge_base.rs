//! Static reference data the scanner and the graph builder share: which
//! service usually listens on a port, which paths are worth asking for, and
//! the wording of automatically generated findings.

use crate::core::models::{Finding, SessionId, Severity};

/// Label given to an open port that has no entry in [`SERVICES`].
pub const UNKNOWN_SERVICE_LABEL: &str = "open";

/// Well-known TCP services, in the order they are probed by default.
static SERVICES: &[(u16, &str)] = &[
    (21, "ftp"),
    (22, "ssh"),
    (23, "telnet"),
    (25, "smtp"),
    (53, "dns"),
    (80, "http"),
    (110, "pop3"),
    (143, "imap"),
    (443, "https"),
    (445, "smb"),
    (3306, "mysql"),
    (3389, "rdp"),
    (5432, "postgresql"),
    (6379, "redis"),
    (8080, "http-alt"),
    (8443, "https-alt"),
    (9200, "elasticsearch"),
    (27017, "mongodb"),
];

/// Paths tried by the enumerator when the caller gives none.
static DEFAULT_PATHS: &[&str] = &[
    "/.env",
    "/.git",
    "/.htaccess",
    "/admin",
    "/api",
    "/backup",
    "/console",
    "/debug",
    "/login",
    "/phpinfo.php",
    "/phpmyadmin",
    "/robots.txt",
    "/server-status",
    "/shell",
    "/sitemap.xml",
    "/wp-admin",
];

/// Best-guess service name for a port, `"open"` when the port is not well known.
pub fn service_label(port: u16) -> &'static str {
    SERVICES
        .iter()
        .find(|(p, _)| *p == port)
        .map(|(_, name)| *name)
        .unwrap_or(UNKNOWN_SERVICE_LABEL)
}

pub fn default_ports() -> Vec<u16> {
    SERVICES.iter().map(|(p, _)| *p).collect()
}

pub fn default_paths() -> Vec<String> {
    DEFAULT_PATHS.iter().map(|p| p.to_string()).collect()
}

/// Builds the finding raised for a discovered path that scored `score`.
///
/// Returns `None` below the reporting threshold of 60. Scores of 80 and above
/// are `HIGH`; the rest are `MEDIUM`.
pub fn sensitive_path_finding(session_id: SessionId, domain: &str, path: &str, score: u8) -> Option<Finding> {
    if score < 60 {
        return None;
    }
    let severity = if score >= 80 { Severity::High } else { Severity::Medium };
    Some(Finding {
        session_id,
        title: format!("Sensitive Path: {path}"),
        severity,
        category: "Exposure".to_string(),
        detail: format!("Directory bruteforce found {path} on {domain}"),
        recommendation: format!("Restrict access to {path}"),
        endpoint: format!("{domain}{path}"),
        status: Default::default(),
    })
}
