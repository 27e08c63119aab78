//! Browser-like request headers with a rotating `User-Agent`.
//!
//! `Accept-Encoding` is left to the transport, which negotiates and decodes
//! gzip/brotli/deflate itself.

use std::collections::BTreeMap;

use rand::seq::IndexedRandom;
use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, REFERER, UPGRADE_INSECURE_REQUESTS,
    USER_AGENT,
};

pub const USER_AGENTS: [&str; 6] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Safari/605.1.15",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36 Edg/120.0.0.0",
];

const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8";
const DEFAULT_REFERER: &str = "https://www.google.com";

/// Pick a user agent uniformly from [`USER_AGENTS`].
#[must_use]
pub fn random_user_agent() -> &'static str {
    USER_AGENTS
        .choose(&mut rand::rng())
        .copied()
        .unwrap_or(USER_AGENTS[0])
}

/// Headers for proxy-client requests: the browser set plus any `custom`
/// headers, which override defaults of the same name.
///
/// Custom entries with an invalid name or value are skipped with a warning.
#[must_use]
pub fn request_headers(custom: Option<&BTreeMap<String, String>>) -> HeaderMap {
    let mut headers = base_headers();
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

    for (name, value) in custom.into_iter().flatten() {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                headers.insert(name, value);
            }
            _ => tracing::warn!(header = %name, "skipping invalid custom header"),
        }
    }

    headers
}

/// Headers for the plain retry path, with a `Referer` defaulting to a search
/// engine landing page.
#[must_use]
pub fn browser_headers(referer: Option<&str>) -> HeaderMap {
    let mut headers = base_headers();
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));
    let referer = referer
        .and_then(|r| HeaderValue::from_str(r).ok())
        .unwrap_or_else(|| HeaderValue::from_static(DEFAULT_REFERER));
    headers.insert(REFERER, referer);
    headers
}

fn base_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(random_user_agent()));
    headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_HTML));
    headers.insert(UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));
    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_user_agent_comes_from_pool() {
        for _ in 0..20 {
            assert!(USER_AGENTS.contains(&random_user_agent()));
        }
    }

    #[test]
    fn request_headers_include_browser_defaults() {
        let headers = request_headers(None);
        let ua = headers.get(USER_AGENT).unwrap().to_str().unwrap();
        assert!(USER_AGENTS.contains(&ua));
        assert_eq!(headers.get(ACCEPT).unwrap(), ACCEPT_HTML);
        assert_eq!(headers.get(ACCEPT_LANGUAGE).unwrap(), "en-US,en;q=0.9");
        assert!(headers.get(REFERER).is_none());
    }

    #[test]
    fn custom_headers_override_defaults() {
        let custom = BTreeMap::from([
            ("User-Agent".to_string(), "storecrawl-test".to_string()),
            ("X-Store-Region".to_string(), "west".to_string()),
        ]);
        let headers = request_headers(Some(&custom));
        assert_eq!(headers.get(USER_AGENT).unwrap(), "storecrawl-test");
        assert_eq!(headers.get("x-store-region").unwrap(), "west");
    }

    #[test]
    fn invalid_custom_header_is_skipped() {
        let custom = BTreeMap::from([("bad header".to_string(), "v".to_string())]);
        let headers = request_headers(Some(&custom));
        assert_eq!(headers.len(), base_headers().len() + 1);
    }

    #[test]
    fn browser_headers_default_referer() {
        let headers = browser_headers(None);
        assert_eq!(headers.get(REFERER).unwrap(), DEFAULT_REFERER);
        assert_eq!(headers.get(ACCEPT_LANGUAGE).unwrap(), "en-US,en;q=0.5");
    }

    #[test]
    fn browser_headers_custom_referer() {
        let headers = browser_headers(Some("https://www.target.com"));
        assert_eq!(headers.get(REFERER).unwrap(), "https://www.target.com");
    }
}
