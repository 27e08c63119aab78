//! Plain GET with retry, for callers that own a bare `reqwest::Client`.
//!
//! Unlike [`crate::ProxyClient`], every attempt is preceded by a random
//! delay, only `200` counts as success, and a `403` triggers a long cooldown
//! before giving up.

use std::time::{Duration, Instant};

use reqwest::header::HeaderMap;
use reqwest::Client;
use storecrawl_core::ProxyMode;

use crate::headers::browser_headers;
use crate::rate_limit::{backoff, pause, random_delay};
use crate::response::{read_response, PageResponse};

#[derive(Debug, Clone)]
pub struct RetryOptions {
    /// Total attempts, including the first.
    pub max_retries: u32,
    pub timeout: Duration,
    /// Base wait after a 429; doubled per attempt.
    pub rate_limit_base_wait: Duration,
    pub min_delay: Duration,
    pub max_delay: Duration,
    /// Wait after a 5xx, a 408 or a transport error.
    pub server_error_wait: Duration,
    /// Cooldown after a 403 before the call gives up.
    pub blocked_wait: Duration,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            max_retries: 3,
            timeout: Duration::from_secs(30),
            rate_limit_base_wait: Duration::from_secs(30),
            min_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(5),
            server_error_wait: Duration::from_secs(10),
            blocked_wait: Duration::from_secs(300),
        }
    }
}

/// What to do with a received status. First match wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Success,
    Retry(Duration),
    Abort { cooldown: Duration },
}

/// Classify a status code for attempt number `attempt` (zero-based).
#[must_use]
pub fn classify_status(status: u16, attempt: u32, options: &RetryOptions) -> Step {
    match status {
        200 => Step::Success,
        429 => Step::Retry(backoff(options.rate_limit_base_wait, attempt)),
        403 => Step::Abort {
            cooldown: options.blocked_wait,
        },
        500.. | 408 => Step::Retry(options.server_error_wait),
        _ => Step::Abort {
            cooldown: Duration::ZERO,
        },
    }
}

/// GET `url` with up to `options.max_retries` attempts.
///
/// Returns the first `200` response, or `None` once the call aborts or the
/// attempts run out. `headers` default to a browser-like set with a search
/// engine referer.
pub async fn get_with_retry(
    client: &Client,
    url: &str,
    options: &RetryOptions,
    headers: Option<&HeaderMap>,
) -> Option<PageResponse> {
    let headers = headers.cloned().unwrap_or_else(|| browser_headers(None));

    for attempt in 0..options.max_retries {
        let last = attempt + 1 >= options.max_retries;
        random_delay(options.min_delay, options.max_delay).await;

        let started = Instant::now();
        let sent = client
            .get(url)
            .headers(headers.clone())
            .timeout(options.timeout)
            .send()
            .await;

        let response = match sent {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(url, attempt = attempt + 1, error = %e, "request failed");
                if !last {
                    pause(options.server_error_wait).await;
                }
                continue;
            }
        };

        let status = response.status().as_u16();
        match classify_status(status, attempt, options) {
            Step::Success => match read_response(response, ProxyMode::Direct, started).await {
                Ok(page) => return Some(page),
                Err(e) => {
                    tracing::warn!(url, attempt = attempt + 1, error = %e, "failed to read body");
                    if !last {
                        pause(options.server_error_wait).await;
                    }
                }
            },
            Step::Retry(wait) => {
                tracing::warn!(
                    url,
                    status,
                    attempt = attempt + 1,
                    wait_secs = wait.as_secs_f64(),
                    "retryable status"
                );
                if !last {
                    pause(wait).await;
                }
            }
            Step::Abort { cooldown } => {
                if cooldown.is_zero() {
                    tracing::warn!(url, status, "request rejected, not retrying");
                } else {
                    tracing::error!(
                        url,
                        status,
                        cooldown_secs = cooldown.as_secs_f64(),
                        "blocked, cooling down before giving up"
                    );
                    pause(cooldown).await;
                }
                return None;
            }
        }
    }

    tracing::error!(url, attempts = options.max_retries, "all attempts failed");
    None
}
