//! Page fetching, crawling and extraction for the catalog site.

pub mod browser;
pub mod executor;
pub mod extract;
pub mod fetcher;
pub mod freshness;
pub mod http_client;
pub mod page;
pub mod rate_limiter;
pub mod slug;

use std::sync::Arc;

pub use browser::{BrowserFetcher, BrowserOptions};
pub use executor::{CrawlError, CrawlExecutor, Seed};
pub use fetcher::{FetchError, FetchedPage, PageFetcher};
pub use http_client::HttpFetcher;
pub use page::{PageDocument, PageElement};
pub use rate_limiter::{RateLimitConfig, RateLimiter};

use crate::config::{FetchTransport, ScraperSettings};

/// Build the fetch transport selected in settings.
pub fn build_fetcher(settings: &ScraperSettings) -> Result<Arc<dyn PageFetcher>, FetchError> {
    match settings.transport {
        FetchTransport::Http => Ok(Arc::new(HttpFetcher::new(&settings.user_agent)?)),
        FetchTransport::Browser => {
            let options = BrowserOptions {
                timeout: settings.request_timeout,
                user_agent: http_client::resolve_user_agent(&settings.user_agent),
                ..Default::default()
            };
            Ok(Arc::new(BrowserFetcher::new(options)?))
        }
    }
}
