use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use serde::de::DeserializeOwned;
use storecrawl_core::ProxyMode;

use crate::error::ScraperError;

/// One fetched page, normalized across proxy modes.
#[derive(Debug, Clone)]
pub struct PageResponse {
    pub status: u16,
    pub text: String,
    pub content: Vec<u8>,
    /// Response headers with lowercase names; repeated headers are joined
    /// with `", "`.
    pub headers: BTreeMap<String, String>,
    /// Final URL after redirects (or the target URL for the scraper API).
    pub url: String,
    pub elapsed: Duration,
    pub mode: ProxyMode,
    pub job_id: Option<String>,
    pub credits_used: Option<f64>,
}

impl PageResponse {
    /// `true` for any 2xx status.
    #[must_use]
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Decode the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Deserialize`] if the body is not valid JSON
    /// for `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ScraperError> {
        serde_json::from_str(&self.text).map_err(|e| ScraperError::Deserialize {
            context: format!("response body from {}", self.url),
            source: e,
        })
    }

    /// Turn a non-2xx response into an error.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::UnexpectedStatus`] unless [`Self::ok`].
    pub fn error_for_status(self) -> Result<Self, ScraperError> {
        if self.ok() {
            Ok(self)
        } else {
            Err(ScraperError::UnexpectedStatus {
                status: self.status,
                url: self.url,
            })
        }
    }
}

/// Drain a `reqwest` response into a [`PageResponse`].
pub(crate) async fn read_response(
    response: reqwest::Response,
    mode: ProxyMode,
    started: Instant,
) -> Result<PageResponse, ScraperError> {
    let status = response.status().as_u16();
    let url = response.url().to_string();
    let headers = collect_headers(response.headers());
    let content = response.bytes().await?.to_vec();
    let text = String::from_utf8_lossy(&content).into_owned();

    Ok(PageResponse {
        status,
        text,
        content,
        headers,
        url,
        elapsed: started.elapsed(),
        mode,
        job_id: None,
        credits_used: None,
    })
}

pub(crate) fn collect_headers(map: &reqwest::header::HeaderMap) -> BTreeMap<String, String> {
    let mut headers: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in map {
        let value = String::from_utf8_lossy(value.as_bytes());
        headers
            .entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert_with(|| value.into_owned());
    }
    headers
}

#[cfg(test)]
mod tests {
    use reqwest::header::{HeaderMap, HeaderValue, SET_COOKIE};

    use super::*;

    fn page(status: u16, text: &str) -> PageResponse {
        PageResponse {
            status,
            text: text.to_string(),
            content: text.as_bytes().to_vec(),
            headers: BTreeMap::new(),
            url: "https://www.att.com/stores/".to_string(),
            elapsed: Duration::ZERO,
            mode: ProxyMode::Direct,
            job_id: None,
            credits_used: None,
        }
    }

    #[test]
    fn ok_covers_exactly_2xx() {
        assert!(!page(199, "").ok());
        assert!(page(200, "").ok());
        assert!(page(204, "").ok());
        assert!(page(299, "").ok());
        assert!(!page(300, "").ok());
        assert!(!page(404, "").ok());
    }

    #[test]
    fn json_decodes_body() {
        let value: serde_json::Value = page(200, r#"{"stores": [1, 2]}"#).json().unwrap();
        assert_eq!(value["stores"][1], 2);
    }

    #[test]
    fn json_reports_bad_body() {
        let result = page(200, "<html>").json::<serde_json::Value>();
        assert!(matches!(result, Err(ScraperError::Deserialize { .. })));
    }

    #[test]
    fn error_for_status_passes_success_through() {
        assert!(page(200, "").error_for_status().is_ok());
    }

    #[test]
    fn error_for_status_rejects_client_error() {
        let err = page(404, "").error_for_status().unwrap_err();
        assert!(
            matches!(err, ScraperError::UnexpectedStatus { status: 404, .. }),
            "unexpected error: {err:?}"
        );
    }

    #[test]
    fn collect_headers_joins_repeated_values() {
        let mut map = HeaderMap::new();
        map.append(SET_COOKIE, HeaderValue::from_static("a=1"));
        map.append(SET_COOKIE, HeaderValue::from_static("b=2"));
        let headers = collect_headers(&map);
        assert_eq!(headers.len(), 1);
        assert_eq!(headers["set-cookie"], "a=1, b=2");
    }
}
