//! Unified page fetcher over direct, residential-proxy and scraper-API
//! transports.

mod transport;

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use serde::Serialize;
use storecrawl_core::{load_proxy_config, ProxyConfig, ProxyMode};

use crate::error::ScraperError;
use crate::headers::request_headers;
use crate::rate_limit::{backoff, pause, random_delay};
use crate::response::{read_response, PageResponse};
use crate::scraper_api::{self, merge_query_params, ScraperApiPayload};

use transport::Transport;

/// Per-call overrides for [`ProxyClient::fetch`].
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    /// Extra headers. Overlaid on the browser set for direct and residential
    /// requests; forwarded as `custom_headers` to the scraper API.
    pub headers: Option<BTreeMap<String, String>>,
    pub params: Vec<(String, String)>,
    /// Scraper API only. Defaults to the configured flag.
    pub render_js: Option<bool>,
    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClientStats {
    pub mode: ProxyMode,
    pub request_count: u64,
    pub country: String,
    pub render_js: bool,
}

/// What the retry loop does with a received status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ProxyStep {
    Success,
    /// Non-retryable client error; the response is handed back as-is.
    ClientError,
    Retry(Duration),
}

pub(crate) fn classify_proxy_status(status: u16, attempt: u32, retry_delay: Duration) -> ProxyStep {
    match status {
        200..=299 => ProxyStep::Success,
        429 => ProxyStep::Retry(backoff(retry_delay, attempt)),
        400..=499 => ProxyStep::ClientError,
        _ => ProxyStep::Retry(retry_delay),
    }
}

/// Failures worth another attempt. Malformed URLs and request-building
/// errors fail the same way every time.
fn is_retriable(err: &ScraperError) -> bool {
    match err {
        ScraperError::Http(e) => !e.is_builder(),
        ScraperError::Deserialize { .. } => true,
        _ => false,
    }
}

/// Page fetcher bound to one [`ProxyConfig`] and one transport.
///
/// Fetches are sequential per caller; the only shared state is the request
/// counter.
pub struct ProxyClient {
    config: ProxyConfig,
    transport: Transport,
    request_count: AtomicU64,
}

impl ProxyClient {
    /// Build a client for `config`. The config is validated first, so proxy
    /// modes without credentials run direct.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Config`] if the config fails
    /// [`ProxyConfig::check_ranges`], [`ScraperError::Http`] if the
    /// `reqwest::Client` cannot be built, or [`ScraperError::InvalidProxy`] for a bad residential
    /// endpoint.
    pub fn new(config: ProxyConfig) -> Result<Self, ScraperError> {
        config.check_ranges()?;
        let config = config.validated();
        let transport = Transport::build(&config)?;
        tracing::info!(
            mode = %config.mode,
            country = %config.country_code,
            "proxy client initialized"
        );
        Ok(Self {
            config,
            transport,
            request_count: AtomicU64::new(0),
        })
    }

    /// Build a client from `.env`, the environment and an optional YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Config`] for configuration errors, otherwise as
    /// [`ProxyClient::new`].
    pub fn from_env(config_path: Option<&std::path::Path>) -> Result<Self, ScraperError> {
        Self::new(load_proxy_config(config_path)?)
    }

    #[must_use]
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    #[must_use]
    pub fn mode(&self) -> ProxyMode {
        self.transport.mode()
    }

    #[must_use]
    pub fn stats(&self) -> ClientStats {
        ClientStats {
            mode: self.mode(),
            request_count: self.request_count.load(Ordering::Relaxed),
            country: self.config.country_code.clone(),
            render_js: self.config.render_js,
        }
    }

    /// GET `url` with the configured defaults.
    pub async fn get(&self, url: &str) -> Option<PageResponse> {
        self.fetch(url, &FetchOptions::default()).await
    }

    /// Fetch `url` through the configured transport with up to `max_retries`
    /// attempts.
    ///
    /// Returns the first 2xx response, or a 4xx (other than 429) response
    /// without retrying. 429 backs off `retry_delay * 2^attempt`; 5xx and
    /// transport errors wait `retry_delay`. Returns `None` when attempts run
    /// out or the request cannot be built.
    pub async fn fetch(&self, url: &str, options: &FetchOptions) -> Option<PageResponse> {
        let timeout = options.timeout.unwrap_or_else(|| self.config.timeout());
        let render_js = options.render_js.unwrap_or(self.config.render_js);
        let max_retries = self.config.max_retries;
        let retry_delay = self.config.retry_delay();

        for attempt in 0..max_retries {
            let last = attempt + 1 >= max_retries;

            let page = match self.send_once(url, options, render_js, timeout).await {
                Ok(page) => page,
                Err(e) if is_retriable(&e) => {
                    tracing::warn!(url, attempt = attempt + 1, error = %e, "request failed");
                    if !last {
                        pause(retry_delay).await;
                    }
                    continue;
                }
                Err(e) => {
                    tracing::error!(url, error = %e, "request cannot be sent");
                    return None;
                }
            };
            self.request_count.fetch_add(1, Ordering::Relaxed);

            match classify_proxy_status(page.status, attempt, retry_delay) {
                ProxyStep::Success => {
                    if self.mode() == ProxyMode::Direct && self.config.max_delay_secs > 0.0 {
                        random_delay(self.config.min_delay(), self.config.max_delay()).await;
                    }
                    return Some(page);
                }
                ProxyStep::ClientError => {
                    tracing::warn!(url, status = page.status, "client error");
                    return Some(page);
                }
                ProxyStep::Retry(wait) => {
                    tracing::warn!(
                        url,
                        status = page.status,
                        attempt = attempt + 1,
                        wait_secs = wait.as_secs_f64(),
                        "retryable status"
                    );
                    if !last {
                        pause(wait).await;
                    }
                }
            }
        }

        tracing::error!(url, attempts = max_retries, "all attempts failed");
        None
    }

    async fn send_once(
        &self,
        url: &str,
        options: &FetchOptions,
        render_js: bool,
        timeout: Duration,
    ) -> Result<PageResponse, ScraperError> {
        match &self.transport {
            Transport::Direct { client } | Transport::Residential { client } => {
                let started = Instant::now();
                let response = client
                    .get(url)
                    .headers(request_headers(options.headers.as_ref()))
                    .query(&options.params)
                    .timeout(timeout)
                    .send()
                    .await?;
                read_response(response, self.mode(), started).await
            }
            Transport::ScraperApi { client, endpoint } => {
                let target = merge_query_params(url, &options.params)?;
                let payload =
                    ScraperApiPayload::new(&self.config, target, options.headers.as_ref(), render_js);
                scraper_api::request(client, endpoint, &self.config, &payload, timeout).await
            }
        }
    }
}

/// Build a client from the environment, overriding the mode and credentials
/// where given.
///
/// # Errors
///
/// As [`ProxyClient::from_env`].
pub fn create_proxy_client(
    mode: Option<ProxyMode>,
    username: Option<&str>,
    password: Option<&str>,
) -> Result<ProxyClient, ScraperError> {
    let mut config = load_proxy_config(None)?;
    if let Some(mode) = mode {
        config.mode = mode;
    }
    if let Some(username) = username {
        config.username = username.to_string();
    }
    if let Some(password) = password {
        config.password = password.to_string();
    }
    ProxyClient::new(config)
}

#[cfg(test)]
#[path = "../client_test.rs"]
mod tests;
