//! Residential proxy routing. Geo-targeting and session stickiness travel
//! inside the proxy username.

use storecrawl_core::{ProxyConfig, SessionType};

use crate::error::ScraperError;

/// Build the targeted proxy username, e.g.
/// `user-country-us-city-seattle-state-wa-session-abc123`.
///
/// Country, city and state are included only when non-empty; the session
/// only for sticky sessions with an id.
#[must_use]
pub fn residential_username(config: &ProxyConfig) -> String {
    let mut parts = vec![config.username.clone()];

    for (key, value) in [
        ("country", &config.country_code),
        ("city", &config.city),
        ("state", &config.state),
    ] {
        if !value.is_empty() {
            parts.push(format!("{key}-{value}"));
        }
    }

    if config.session_type == SessionType::Sticky && !config.session_id.is_empty() {
        parts.push(format!("session-{}", config.session_id));
    }

    parts.join("-")
}

/// A `reqwest` proxy for every scheme, authenticated with the targeted
/// username.
///
/// # Errors
///
/// Returns [`ScraperError::InvalidProxy`] if the endpoint does not form a
/// valid proxy URL.
pub fn build_proxy(config: &ProxyConfig) -> Result<reqwest::Proxy, ScraperError> {
    let endpoint = &config.residential_endpoint;
    let proxy_url = if endpoint.contains("://") {
        endpoint.clone()
    } else {
        format!("http://{endpoint}")
    };

    let proxy = reqwest::Proxy::all(&proxy_url).map_err(|e| ScraperError::InvalidProxy {
        endpoint: endpoint.clone(),
        reason: e.to_string(),
    })?;

    Ok(proxy.basic_auth(&residential_username(config), &config.password))
}
