// src/core/risk.rs

//! Heuristic risk scoring. Every table here is evaluated top to bottom and
//! the first matching rule wins, so the order of entries is policy.

use crate::core::models::{RiskScore, ScanResult};

/// A lower-cased substring that, when found, contributes `weight`.
struct Rule {
    needle: &'static str,
    weight: i64,
}

/// Sensitive paths, most specific first. `/phpmyadmin` precedes `/admin` so
/// that `/admin/phpmyadmin` reports the database console.
static SENSITIVE_PATHS: &[Rule] = &[
    Rule { needle: "/.env", weight: 95 },
    Rule { needle: "/.git", weight: 95 },
    Rule { needle: "/shell", weight: 95 },
    Rule { needle: "/phpmyadmin", weight: 90 },
    Rule { needle: "/.htaccess", weight: 85 },
    Rule { needle: "/wp-admin", weight: 80 },
    Rule { needle: "/console", weight: 80 },
    Rule { needle: "/admin", weight: 80 },
    Rule { needle: "/phpinfo", weight: 75 },
    Rule { needle: "/backup", weight: 75 },
    Rule { needle: "/server-status", weight: 70 },
    Rule { needle: "/debug", weight: 70 },
];

/// Lower-value paths checked only when no sensitive path matched.
static NOTABLE_PATHS: &[Rule] = &[
    Rule { needle: "/api", weight: 30 },
    Rule { needle: "/login", weight: 40 },
];

const BASELINE_PATH_WEIGHT: i64 = 10;

/// Base exposure of a port that is open at all.
static PORT_WEIGHTS: &[(u16, i64)] = &[
    (21, 25),
    (22, 15),
    (23, 30),
    (25, 10),
    (3306, 30),
    (5432, 30),
    (6379, 35),
    (8080, 15),
    (8443, 10),
    (9200, 25),
    (27017, 35),
];

const DEFAULT_PORT_WEIGHT: i64 = 5;

/// Apache 2.4.49 path traversal / RCE (CVE-2021-41773).
const APACHE_2_4_49: &str = "apache 2.4.49";

/// Banners of known-vulnerable server builds. Unlike the path tables, every
/// matching rule adds its weight.
static VULNERABLE_BANNERS: &[Rule] = &[
    Rule { needle: APACHE_2_4_49, weight: 40 },
    // CVE-2021-42013
    Rule { needle: "apache 2.4.50", weight: 35 },
    Rule { needle: "nginx 1.0", weight: 20 },
];

/// Ports whose mere presence raises the target score.
static TARGET_PORT_WEIGHTS: &[(u16, i64)] = &[(8080, 15), (3306, 25), (22, 10)];

const CLOUD_WEIGHT: i64 = 5;

fn path_weight(path: &str) -> i64 {
    let path = path.trim().to_lowercase();
    SENSITIVE_PATHS
        .iter()
        .chain(NOTABLE_PATHS)
        .find(|rule| path.contains(rule.needle))
        .map(|rule| rule.weight)
        .unwrap_or(BASELINE_PATH_WEIGHT)
}

/// Scores a discovered path by the first table entry it contains.
pub fn path_risk(path: &str) -> RiskScore {
    RiskScore::clamped(path_weight(path))
}

/// Scores an open port from its number and the service banner seen on it.
pub fn port_risk(port: u16, service: &str) -> RiskScore {
    let base = PORT_WEIGHTS
        .iter()
        .find(|(p, _)| *p == port)
        .map(|(_, w)| *w)
        .unwrap_or(DEFAULT_PORT_WEIGHT);
    let banner_bonus = if service.to_lowercase().contains(APACHE_2_4_49) { 40 } else { 0 };
    RiskScore::clamped(base + banner_bonus)
}

/// Aggregate score for a whole target. Independent of input ordering.
pub fn target_risk(scan: &ScanResult) -> RiskScore {
    let mut score: i64 = 0;

    for (port, weight) in TARGET_PORT_WEIGHTS {
        if scan.ports.contains(port) {
            score += weight;
        }
    }

    for banner in scan.port_detail.values() {
        let banner = banner.to_lowercase();
        score += VULNERABLE_BANNERS
            .iter()
            .filter(|rule| banner.contains(rule.needle))
            .map(|rule| rule.weight)
            .sum::<i64>();
    }

    score += scan.dirb.iter().map(|path| path_weight(path) / 5).sum::<i64>();

    if scan.is_cloud_hosted() {
        score += CLOUD_WEIGHT;
    }

    RiskScore::clamped(score)
}
