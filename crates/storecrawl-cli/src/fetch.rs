//! `fetch` command: one page through the proxy client or the plain
//! retrying GET.

use std::path::PathBuf;

use anyhow::Context;
use storecrawl_core::load_proxy_config;
use storecrawl_scraper::{get_with_retry, FetchOptions, PageResponse, ProxyClient, RetryOptions};

#[derive(Debug)]
pub(crate) struct FetchRequest {
    pub url: String,
    pub config: Option<PathBuf>,
    pub render_js: bool,
    pub plain: bool,
    pub params: Vec<(String, String)>,
    pub output: Option<PathBuf>,
}

pub(crate) async fn run_fetch(request: FetchRequest) -> anyhow::Result<()> {
    let page = if request.plain {
        fetch_plain(&request).await?
    } else {
        fetch_proxied(&request).await?
    };

    let Some(page) = page else {
        anyhow::bail!("no response from {}", request.url);
    };

    tracing::info!(
        url = %page.url,
        status = page.status,
        bytes = page.content.len(),
        elapsed_ms = page.elapsed.as_millis(),
        "page fetched"
    );
    if !page.ok() {
        tracing::warn!(status = page.status, "non-success response");
    }

    match &request.output {
        Some(path) => {
            std::fs::write(path, &page.content)
                .with_context(|| format!("failed to write {}", path.display()))?;
            tracing::info!(path = %path.display(), "body written");
        }
        None => println!("{}", page.text),
    }
    Ok(())
}

async fn fetch_proxied(request: &FetchRequest) -> anyhow::Result<Option<PageResponse>> {
    let mut config =
        load_proxy_config(request.config.as_deref()).context("failed to load proxy config")?;
    if request.render_js {
        config.render_js = true;
    }

    let client = ProxyClient::new(config).context("failed to build proxy client")?;
    let options = FetchOptions {
        params: request.params.clone(),
        ..FetchOptions::default()
    };
    let page = client.fetch(&request.url, &options).await;

    let stats = client.stats();
    tracing::info!(
        mode = %stats.mode,
        requests = stats.request_count,
        country = %stats.country,
        "proxy client stats"
    );
    Ok(page)
}

async fn fetch_plain(request: &FetchRequest) -> anyhow::Result<Option<PageResponse>> {
    let options = RetryOptions::default();
    let client = reqwest::Client::builder()
        .timeout(options.timeout)
        .build()
        .context("failed to build HTTP client")?;

    let url = if request.params.is_empty() {
        request.url.clone()
    } else {
        let mut url = reqwest::Url::parse(&request.url)
            .with_context(|| format!("invalid URL {}", request.url))?;
        url.query_pairs_mut().extend_pairs(&request.params);
        url.to_string()
    };

    Ok(get_with_retry(&client, &url, &options, None).await)
}
