pub mod client;
pub mod error;
pub mod headers;
pub mod rate_limit;
pub mod residential;
pub mod response;
pub mod retry;
pub mod scraper_api;

pub use client::{create_proxy_client, ClientStats, FetchOptions, ProxyClient};
pub use error::ScraperError;
pub use headers::{browser_headers, random_user_agent, request_headers};
pub use rate_limit::{pick_delay, random_delay};
pub use residential::residential_username;
pub use response::PageResponse;
pub use retry::{get_with_retry, RetryOptions};
pub use scraper_api::ScraperApiPayload;
