// src/core/scanner/path_enumerator.rs

use std::collections::{BTreeSet, HashSet};

use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};
use url::Url;

use crate::core::scanner::http_prober::HttpProber;

/// Statuses that count as "the path exists": reachable, redirecting, or access-controlled.
pub const FOUND_STATUSES: &[u16] = &[200, 204, 301, 302, 307, 308, 401, 403];

/// Cleans a candidate path list: trims entries, drops blanks and duplicates,
/// and makes sure every path starts with `/`.
pub fn normalize_paths<I, S>(paths: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    paths
        .into_iter()
        .map(|p| p.as_ref().trim().to_string())
        .filter(|p| !p.is_empty())
        .map(|p| if p.starts_with('/') { p } else { format!("/{p}") })
        .filter(|p| seen.insert(p.clone()))
        .collect()
}

/// Parses a path spec separated by commas or whitespace, e.g. `"/admin, .git\n/backup"`.
pub fn parse_path_spec(spec: &str) -> Vec<String> {
    normalize_paths(spec.split(|c: char| c == ',' || c.is_whitespace()))
}

fn join_path(base_url: &str, path: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), path)
}

/// Probes every path under `base_url` and returns the ones that answered with a
/// status in [`FOUND_STATUSES`].
///
/// Requests run concurrently; the returned set is sorted, so the result does
/// not depend on completion order.
pub async fn enumerate_paths(
    prober: &HttpProber,
    base_url: &str,
    paths: &[String],
    concurrency: usize,
) -> BTreeSet<String> {
    if paths.is_empty() {
        return BTreeSet::new();
    }
    info!(base_url, candidates = paths.len(), "Starting path enumeration.");

    let found: BTreeSet<String> = stream::iter(paths.iter())
        .map(|path| async move {
            let target = join_path(base_url, path);
            let Ok(url) = Url::parse(&target) else {
                warn!(url = %target, "Skipping unparseable path URL.");
                return None;
            };
            let response = prober.fetch(&url).await?;
            if FOUND_STATUSES.contains(&response.status) {
                debug!(path = %path, status = response.status, "Path found.");
                Some(path.clone())
            } else {
                debug!(path = %path, status = response.status, "Path not found.");
                None
            }
        })
        .buffer_unordered(concurrency.max(1))
        .filter_map(|path| async move { path })
        .collect()
        .await;

    info!(base_url, found = found.len(), "Path enumeration finished.");
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn path_spec_normalization() {
        assert_eq!(
            parse_path_spec(" /admin, .git\n\nbackup ,/admin"),
            vec!["/admin".to_string(), "/.git".to_string(), "/backup".to_string()]
        );
        assert!(parse_path_spec(" , ").is_empty());
    }

    #[test]
    fn joins_without_double_slash() {
        assert_eq!(join_path("https://a.io/", "/admin"), "https://a.io/admin");
        assert_eq!(join_path("https://a.io", "/admin"), "https://a.io/admin");
    }

    #[tokio::test]
    async fn classifies_paths_by_status() {
        let server = MockServer::start().await;
        for (p, status) in [("/admin", 403), ("/api", 200), ("/old", 301), ("/secret", 401), ("/gone", 404), ("/boom", 500)] {
            Mock::given(method("HEAD"))
                .and(path(p))
                .respond_with(ResponseTemplate::new(status))
                .mount(&server)
                .await;
        }
        let prober = HttpProber::new(Duration::from_secs(2), 5).unwrap();
        let candidates = parse_path_spec("/admin,/api,/old,/secret,/gone,/boom,/missing");

        let found = enumerate_paths(&prober, &format!("{}/", server.uri()), &candidates, 4).await;
        let expected: BTreeSet<String> = ["/admin", "/api", "/old", "/secret"].into_iter().map(String::from).collect();
        assert_eq!(found, expected);
    }

    #[tokio::test]
    async fn empty_path_list_makes_no_requests() {
        let server = MockServer::start().await;
        let prober = HttpProber::new(Duration::from_secs(2), 5).unwrap();
        assert!(enumerate_paths(&prober, &server.uri(), &[], 4).await.is_empty());
        assert!(server.received_requests().await.unwrap().is_empty());
    }
}
