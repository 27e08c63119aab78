//! Managed scraper API: the service fetches the target on our behalf and
//! returns the page wrapped in a JSON envelope.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use storecrawl_core::{ProxyConfig, ProxyMode};

use crate::error::ScraperError;
use crate::response::{collect_headers, PageResponse};

const SOURCE_UNIVERSAL: &str = "universal";

/// Request body for the scraper API. Absent optional fields are omitted.
#[derive(Debug, Serialize, PartialEq)]
pub struct ScraperApiPayload<'a> {
    pub source: &'static str,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geo_location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub render: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_headers: Option<&'a BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parse: Option<bool>,
}

impl<'a> ScraperApiPayload<'a> {
    #[must_use]
    pub fn new(
        config: &ProxyConfig,
        url: String,
        headers: Option<&'a BTreeMap<String, String>>,
        render_js: bool,
    ) -> Self {
        Self {
            source: SOURCE_UNIVERSAL,
            url,
            geo_location: (!config.country_code.is_empty())
                .then(|| config.country_code.to_ascii_uppercase()),
            render: render_js.then_some("html"),
            custom_headers: headers.filter(|h| !h.is_empty()),
            parse: config.parse.then_some(true),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiEnvelope {
    #[serde(default)]
    results: Vec<ApiResult>,
    #[serde(default)]
    job_id: Option<Value>,
    #[serde(default)]
    credits_used: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ApiResult {
    #[serde(default)]
    content: Value,
    #[serde(default)]
    status_code: Option<u16>,
}

/// Merge `params` into the query string of `url`, replacing existing keys.
///
/// # Errors
///
/// Returns [`ScraperError::InvalidUrl`] if `url` cannot be parsed.
pub fn merge_query_params(url: &str, params: &[(String, String)]) -> Result<String, ScraperError> {
    if params.is_empty() {
        return Ok(url.to_string());
    }

    let mut parsed = Url::parse(url).map_err(|e| ScraperError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    let mut pairs: Vec<(String, String)> = parsed
        .query_pairs()
        .into_owned()
        .filter(|(key, _)| !params.iter().any(|(k, _)| k == key))
        .collect();
    pairs.extend(params.iter().cloned());

    parsed.query_pairs_mut().clear().extend_pairs(&pairs);
    Ok(parsed.to_string())
}

/// POST one job to the scraper API and normalize the reply.
///
/// # Errors
///
/// [`ScraperError::Http`] on transport failure and
/// [`ScraperError::Deserialize`] when a 200 reply is not a valid envelope.
/// Both are retried by the caller.
pub(crate) async fn request(
    client: &Client,
    endpoint: &str,
    config: &ProxyConfig,
    payload: &ScraperApiPayload<'_>,
    timeout: Duration,
) -> Result<PageResponse, ScraperError> {
    let started = Instant::now();
    let response = client
        .post(endpoint)
        .basic_auth(&config.username, Some(&config.password))
        .timeout(timeout)
        .json(payload)
        .send()
        .await?;

    let status = response.status().as_u16();
    let headers = collect_headers(response.headers());
    let body = response.bytes().await?.to_vec();

    unwrap_envelope(status, headers, body, &payload.url, started.elapsed())
}

/// Unwrap `results[0]` from a 200 reply; anything else becomes an
/// error-shaped response carrying the service's own status and body.
fn unwrap_envelope(
    status: u16,
    headers: BTreeMap<String, String>,
    body: Vec<u8>,
    url: &str,
    elapsed: Duration,
) -> Result<PageResponse, ScraperError> {
    if status == 200 {
        let envelope: ApiEnvelope =
            serde_json::from_slice(&body).map_err(|e| ScraperError::Deserialize {
                context: format!("scraper API reply for {url}"),
                source: e,
            })?;

        if let Some(result) = envelope.results.into_iter().next() {
            let text = match result.content {
                Value::String(s) => s,
                Value::Null => String::new(),
                other => other.to_string(),
            };
            return Ok(PageResponse {
                status: result.status_code.unwrap_or(200),
                content: text.clone().into_bytes(),
                text,
                headers: BTreeMap::new(),
                url: url.to_string(),
                elapsed,
                mode: ProxyMode::ScraperApi,
                job_id: envelope.job_id.and_then(job_id_string),
                credits_used: envelope.credits_used,
            });
        }
        tracing::warn!(url, "scraper API returned no results");
    }

    Ok(PageResponse {
        status,
        text: String::from_utf8_lossy(&body).into_owned(),
        content: body,
        headers,
        url: url.to_string(),
        elapsed,
        mode: ProxyMode::ScraperApi,
        job_id: None,
        credits_used: None,
    })
}

fn job_id_string(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn config() -> ProxyConfig {
        ProxyConfig {
            mode: ProxyMode::ScraperApi,
            username: "u".to_string(),
            password: "p".to_string(),
            ..ProxyConfig::default()
        }
    }

    #[test]
    fn payload_omits_unset_fields() {
        let config = ProxyConfig {
            country_code: String::new(),
            ..config()
        };
        let payload = ScraperApiPayload::new(&config, "https://www.target.com/store-locator".into(), None, false);
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            json!({"source": "universal", "url": "https://www.target.com/store-locator"})
        );
    }

    #[test]
    fn payload_omits_empty_custom_headers() {
        let empty = BTreeMap::new();
        let payload = ScraperApiPayload::new(&config(), "https://a.example".into(), Some(&empty), false);
        let value = serde_json::to_value(&payload).unwrap();
        assert!(value.get("custom_headers").is_none());
    }

    #[test]
    fn payload_includes_all_options() {
        let config = ProxyConfig {
            parse: true,
            ..config()
        };
        let headers = BTreeMap::from([("X-Test".to_string(), "1".to_string())]);
        let payload = ScraperApiPayload::new(&config, "https://a.example".into(), Some(&headers), true);
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            json!({
                "source": "universal",
                "url": "https://a.example",
                "geo_location": "US",
                "render": "html",
                "custom_headers": {"X-Test": "1"},
                "parse": true
            })
        );
    }

    #[test]
    fn merge_query_params_appends_and_overwrites() {
        let merged = merge_query_params(
            "https://www.bestbuy.com/site/store-locator?page=1&q=wa",
            &[
                ("page".to_string(), "2".to_string()),
                ("radius".to_string(), "50".to_string()),
            ],
        )
        .unwrap();
        assert_eq!(
            merged,
            "https://www.bestbuy.com/site/store-locator?q=wa&page=2&radius=50"
        );
    }

    #[test]
    fn merge_query_params_without_params_is_identity() {
        let url = "not even a url";
        assert_eq!(merge_query_params(url, &[]).unwrap(), url);
    }

    #[test]
    fn merge_query_params_rejects_bad_url() {
        let result = merge_query_params("::nope", &[("a".to_string(), "b".to_string())]);
        assert!(matches!(result, Err(ScraperError::InvalidUrl { .. })));
    }

    #[test]
    fn envelope_unwraps_first_result() {
        let body = json!({
            "results": [{"content": "<html>stores</html>", "status_code": 200}],
            "job_id": "12345",
            "credits_used": 1.5
        });
        let page = unwrap_envelope(
            200,
            BTreeMap::new(),
            serde_json::to_vec(&body).unwrap(),
            "https://a.example",
            Duration::ZERO,
        )
        .unwrap();
        assert_eq!(page.status, 200);
        assert_eq!(page.text, "<html>stores</html>");
        assert_eq!(page.content, b"<html>stores</html>");
        assert_eq!(page.job_id.as_deref(), Some("12345"));
        assert_eq!(page.credits_used, Some(1.5));
        assert_eq!(page.mode, ProxyMode::ScraperApi);
    }

    #[test]
    fn envelope_carries_target_status() {
        let body = json!({"results": [{"content": "gone", "status_code": 404}]});
        let page = unwrap_envelope(
            200,
            BTreeMap::new(),
            serde_json::to_vec(&body).unwrap(),
            "https://a.example",
            Duration::ZERO,
        )
        .unwrap();
        assert_eq!(page.status, 404);
    }

    #[test]
    fn parsed_content_becomes_json_text() {
        let body = json!({"results": [{"content": {"stores": [1]}}], "job_id": 77});
        let page = unwrap_envelope(
            200,
            BTreeMap::new(),
            serde_json::to_vec(&body).unwrap(),
            "https://a.example",
            Duration::ZERO,
        )
        .unwrap();
        assert_eq!(page.status, 200);
        assert_eq!(page.json::<Value>().unwrap(), json!({"stores": [1]}));
        assert_eq!(page.job_id.as_deref(), Some("77"));
    }

    #[test]
    fn empty_results_is_error_shaped() {
        let page = unwrap_envelope(
            200,
            BTreeMap::new(),
            br#"{"results": []}"#.to_vec(),
            "https://a.example",
            Duration::ZERO,
        )
        .unwrap();
        assert_eq!(page.status, 200);
        assert_eq!(page.text, r#"{"results": []}"#);
        assert!(page.job_id.is_none());
    }

    #[test]
    fn non_200_is_error_shaped() {
        let page = unwrap_envelope(
            401,
            BTreeMap::from([("content-type".to_string(), "text/plain".to_string())]),
            b"unauthorized".to_vec(),
            "https://a.example",
            Duration::ZERO,
        )
        .unwrap();
        assert_eq!(page.status, 401);
        assert_eq!(page.text, "unauthorized");
        assert_eq!(page.headers["content-type"], "text/plain");
    }

    #[test]
    fn malformed_envelope_is_an_error() {
        let result = unwrap_envelope(
            200,
            BTreeMap::new(),
            b"<html>".to_vec(),
            "https://a.example",
            Duration::ZERO,
        );
        assert!(matches!(result, Err(ScraperError::Deserialize { .. })));
    }
}
