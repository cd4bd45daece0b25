// src/core/scanner/http_prober.rs

use std::time::Duration;

use reqwest::header::{HeaderMap, LOCATION, SERVER};
use reqwest::redirect::Policy;
use reqwest::Client;
use tracing::{debug, info, warn};
use url::Url;

use crate::core::error::ReconError;
use crate::core::models::LivenessResult;

const USER_AGENT: &str = "ReconGraph/0.1";

/// Statuses after which the `Location` header is followed.
const REDIRECT_STATUSES: &[u16] = &[301, 302, 303, 307, 308];

/// The parts of one HTTP response the prober cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ProbeResponse {
    pub status: u16,
    pub server: Option<String>,
    pub location: Option<String>,
}

fn header_value(headers: &HeaderMap, name: reqwest::header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .filter(|v| !v.is_empty())
}

/// Issues cheap probe requests and follows redirects by hand so every hop's status is recorded.
#[derive(Debug, Clone)]
pub struct HttpProber {
    client: Client,
    max_redirects: usize,
}

impl HttpProber {
    /// Builds a prober whose every request is bounded by `timeout`.
    ///
    /// Certificate errors are ignored: a host with a broken certificate is still alive.
    pub fn new(timeout: Duration, max_redirects: usize) -> Result<Self, ReconError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .connect_timeout(timeout)
            .redirect(Policy::none())
            .danger_accept_invalid_certs(true)
            .build()?;
        Ok(Self { client, max_redirects })
    }

    /// One request against `url`: `HEAD` first, then a single `GET` if the transport failed.
    ///
    /// `None` means the URL could not be reached at all.
    pub(crate) async fn fetch(&self, url: &Url) -> Option<ProbeResponse> {
        let response = match self.client.head(url.clone()).send().await {
            Ok(res) => res,
            Err(head_err) => {
                debug!(url = %url, error = %head_err, "HEAD failed, retrying with GET.");
                match self.client.get(url.clone()).send().await {
                    Ok(res) => res,
                    Err(e) => {
                        debug!(url = %url, error = %e, "URL unreachable.");
                        return None;
                    }
                }
            }
        };
        let headers = response.headers();
        Some(ProbeResponse {
            status: response.status().as_u16(),
            server: header_value(headers, SERVER),
            location: header_value(headers, LOCATION),
        })
    }

    /// Probes `base_url` for liveness, following at most `max_redirects` redirects.
    ///
    /// At most `max_redirects + 1` requests are made, even when a target keeps
    /// redirecting to itself. The server header is the one sent for `base_url`.
    ///
    /// # Returns
    /// `None` when the first request gets no response at all, so the caller
    /// can try another scheme.
    pub async fn probe(&self, base_url: &str) -> Option<LivenessResult> {
        let Ok(start) = Url::parse(base_url) else {
            warn!(url = base_url, "Not a probeable URL.");
            return None;
        };
        info!(url = base_url, "Starting liveness probe.");

        let mut current = start;
        let mut response = self.fetch(&current).await?;
        let server_header = response.server.clone().unwrap_or_default();
        let mut chain = Vec::new();

        while REDIRECT_STATUSES.contains(&response.status) && chain.len() < self.max_redirects {
            let Some(next) = response.location.as_deref().and_then(|loc| current.join(loc).ok()) else {
                debug!(url = %current, status = response.status, "Redirect without usable Location.");
                break;
            };
            debug!(from = %current, to = %next, status = response.status, "Following redirect.");
            match self.fetch(&next).await {
                Some(next_response) => {
                    chain.push(response.status);
                    current = next;
                    response = next_response;
                }
                None => {
                    debug!(url = %next, "Redirect target unreachable, stopping.");
                    break;
                }
            }
        }

        // No hop taken: report the requested URL verbatim, not its normalized form.
        let final_url = if chain.is_empty() { base_url.to_string() } else { current.to_string() };
        info!(url = base_url, final_url = %final_url, status = response.status, hops = chain.len(), "Liveness probe finished.");
        Some(LivenessResult {
            requested_url: base_url.to_string(),
            final_url,
            final_status: response.status,
            server_header,
            redirect_chain: chain,
            cdn_name: String::new(),
        })
    }
}
