use thiserror::Error;

/// Errors raised by the request layer.
///
/// Inside the retry loops `Http` and `Deserialize` are transient signals and
/// are consumed by a retry; callers of the fetch methods only see the
/// construction-time variants and the helpers on
/// [`crate::PageResponse`].
#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("invalid URL \"{url}\": {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("invalid proxy endpoint \"{endpoint}\": {reason}")]
    InvalidProxy { endpoint: String, reason: String },

    #[error(transparent)]
    Config(#[from] storecrawl_core::ConfigError),
}
