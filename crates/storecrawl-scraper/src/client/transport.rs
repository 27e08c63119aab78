use std::time::Duration;

use reqwest::Client;
use storecrawl_core::{ProxyConfig, ProxyMode};

use crate::error::ScraperError;
use crate::residential::build_proxy;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// One HTTP transport per client, selected by the configured mode.
///
/// Direct and scraper-API transports honour `HTTP_PROXY`/`HTTPS_PROXY`
/// from the environment; the residential transport always uses its own
/// proxy.
pub(super) enum Transport {
    Direct { client: Client },
    Residential { client: Client },
    ScraperApi { client: Client, endpoint: String },
}

impl Transport {
    pub(super) fn build(config: &ProxyConfig) -> Result<Self, ScraperError> {
        let builder = Client::builder()
            .timeout(config.timeout())
            .connect_timeout(CONNECT_TIMEOUT);

        let transport = match config.mode {
            ProxyMode::Direct => Self::Direct {
                client: builder.build()?,
            },
            ProxyMode::Residential => Self::Residential {
                client: builder.proxy(build_proxy(config)?).build()?,
            },
            ProxyMode::ScraperApi => Self::ScraperApi {
                client: builder.build()?,
                endpoint: config.scraper_api_endpoint.clone(),
            },
        };
        Ok(transport)
    }

    pub(super) fn mode(&self) -> ProxyMode {
        match self {
            Self::Direct { .. } => ProxyMode::Direct,
            Self::Residential { .. } => ProxyMode::Residential,
            Self::ScraperApi { .. } => ProxyMode::ScraperApi,
        }
    }
}
