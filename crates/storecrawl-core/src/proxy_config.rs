use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

pub(crate) const DEFAULT_RESIDENTIAL_ENDPOINT: &str = "pr.oxylabs.io:7777";
pub(crate) const DEFAULT_SCRAPER_API_ENDPOINT: &str = "https://realtime.oxylabs.io/v1/queries";

/// Length of a generated sticky-session id.
const GENERATED_SESSION_ID_LEN: usize = 10;

/// How outbound requests leave the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProxyMode {
    /// No intermediary; requests use the host's own egress.
    Direct,
    /// Forward proxy with geo-targeting encoded in the proxy username.
    Residential,
    /// Managed scraping service that performs the fetch on our behalf.
    #[serde(rename = "web_scraper_api", alias = "scraper_api")]
    ScraperApi,
}

impl ProxyMode {
    /// Parse a mode name case-insensitively.
    ///
    /// Accepts `direct`, `residential`, `web_scraper_api` and the short alias
    /// `scraper_api`. Returns `None` for anything else.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "direct" => Some(Self::Direct),
            "residential" => Some(Self::Residential),
            "web_scraper_api" | "scraper_api" => Some(Self::ScraperApi),
            _ => None,
        }
    }

    /// Like [`ProxyMode::parse`], but unknown values fall back to
    /// [`ProxyMode::Direct`] with a warning.
    #[must_use]
    pub fn parse_or_direct(s: &str) -> Self {
        Self::parse(s).unwrap_or_else(|| {
            tracing::warn!(mode = s, "unknown proxy mode, using direct");
            Self::Direct
        })
    }
}

impl std::fmt::Display for ProxyMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProxyMode::Direct => write!(f, "direct"),
            ProxyMode::Residential => write!(f, "residential"),
            ProxyMode::ScraperApi => write!(f, "web_scraper_api"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionType {
    #[default]
    Rotating,
    Sticky,
}

impl SessionType {
    /// Unknown values are treated as rotating.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("sticky") {
            Self::Sticky
        } else {
            Self::Rotating
        }
    }
}

/// Request-layer configuration, built once per run.
///
/// Use [`crate::load_proxy_config`] to build one from defaults, an optional
/// YAML file and the environment. Construct directly for tests.
#[derive(Clone)]
pub struct ProxyConfig {
    pub mode: ProxyMode,
    pub username: String,
    pub password: String,
    pub residential_endpoint: String,
    /// Country targeting; also sent as `geo_location` to the scraper API.
    pub country_code: String,
    pub city: String,
    pub state: String,
    pub session_type: SessionType,
    pub session_id: String,
    pub scraper_api_endpoint: String,
    pub render_js: bool,
    /// Ask the scraper API for parsed JSON instead of raw HTML.
    pub parse: bool,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub retry_delay_secs: f64,
    /// Inter-request delay bounds; only applied in direct mode.
    pub min_delay_secs: f64,
    pub max_delay_secs: f64,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            mode: ProxyMode::Direct,
            username: String::new(),
            password: String::new(),
            residential_endpoint: DEFAULT_RESIDENTIAL_ENDPOINT.to_string(),
            country_code: "us".to_string(),
            city: String::new(),
            state: String::new(),
            session_type: SessionType::Rotating,
            session_id: String::new(),
            scraper_api_endpoint: DEFAULT_SCRAPER_API_ENDPOINT.to_string(),
            render_js: false,
            parse: false,
            timeout_secs: 60,
            max_retries: 3,
            retry_delay_secs: 2.0,
            min_delay_secs: 0.0,
            max_delay_secs: 0.0,
        }
    }
}

impl ProxyConfig {
    /// `true` when requests go through a proxy product.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.mode != ProxyMode::Direct
    }

    #[must_use]
    pub fn has_credentials(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty()
    }

    /// Normalize the config for use.
    ///
    /// Proxy modes without credentials are downgraded to direct mode (the run
    /// continues unproxied rather than failing). A sticky session without an
    /// id gets a generated one. Calling this twice is a no-op the second time.
    #[must_use]
    pub fn validated(mut self) -> Self {
        if self.is_enabled() && !self.has_credentials() {
            tracing::error!(
                mode = %self.mode,
                "proxy credentials required for non-direct mode"
            );
            tracing::warn!("invalid proxy config, falling back to direct mode");
            self.mode = ProxyMode::Direct;
        }

        if self.session_type == SessionType::Sticky && self.session_id.is_empty() {
            let mut id = uuid::Uuid::new_v4().simple().to_string();
            id.truncate(GENERATED_SESSION_ID_LEN);
            tracing::debug!(session_id = %id, "generated sticky session id");
            self.session_id = id;
        }

        self
    }

    /// Rejects values no request loop can run with.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] naming the first field out of
    /// range.
    pub fn check_ranges(&self) -> Result<(), ConfigError> {
        if self.max_retries == 0 {
            return Err(ConfigError::Validation(
                "max_retries must be at least 1".to_string(),
            ));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "timeout must be at least 1 second".to_string(),
            ));
        }

        for (name, value) in [
            ("retry_delay", self.retry_delay_secs),
            ("min_delay", self.min_delay_secs),
            ("max_delay", self.max_delay_secs),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Validation(format!(
                    "{name} must be a non-negative number of seconds, got {value}"
                )));
            }
        }

        if self.max_delay_secs < self.min_delay_secs {
            return Err(ConfigError::Validation(format!(
                "max_delay ({}) must not be less than min_delay ({})",
                self.max_delay_secs, self.min_delay_secs
            )));
        }

        Ok(())
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    #[must_use]
    pub fn retry_delay(&self) -> Duration {
        secs_to_duration(self.retry_delay_secs)
    }

    #[must_use]
    pub fn min_delay(&self) -> Duration {
        secs_to_duration(self.min_delay_secs)
    }

    #[must_use]
    pub fn max_delay(&self) -> Duration {
        secs_to_duration(self.max_delay_secs)
    }
}

/// Negative, NaN or overflowing values collapse to zero.
fn secs_to_duration(secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs).unwrap_or(Duration::ZERO)
}

impl std::fmt::Debug for ProxyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyConfig")
            .field("mode", &self.mode)
            .field("username", &self.username)
            .field(
                "password",
                &(!self.password.is_empty()).then_some("[redacted]"),
            )
            .field("residential_endpoint", &self.residential_endpoint)
            .field("country_code", &self.country_code)
            .field("city", &self.city)
            .field("state", &self.state)
            .field("session_type", &self.session_type)
            .field("session_id", &self.session_id)
            .field("scraper_api_endpoint", &self.scraper_api_endpoint)
            .field("render_js", &self.render_js)
            .field("parse", &self.parse)
            .field("timeout_secs", &self.timeout_secs)
            .field("max_retries", &self.max_retries)
            .field("retry_delay_secs", &self.retry_delay_secs)
            .field("min_delay_secs", &self.min_delay_secs)
            .field("max_delay_secs", &self.max_delay_secs)
            .finish()
    }
}
