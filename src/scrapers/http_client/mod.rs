//! Plain HTTP page fetcher.
//!
//! The body is read to completion before returning, which is as quiet as the
//! network gets without a browser. Scripts on the page do not run.

mod user_agent;

pub use user_agent::{resolve_user_agent, USER_AGENT};

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use super::fetcher::{FetchError, FetchedPage, PageFetcher};

/// Upper bound on establishing a connection. Overall request time is bounded by the caller.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// reqwest-backed [`PageFetcher`].
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Create a fetcher. `user_agent` follows [`resolve_user_agent`] rules.
    pub fn new(user_agent: &str) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(resolve_user_agent(user_agent))
            .connect_timeout(CONNECT_TIMEOUT)
            .cookie_store(true)
            .gzip(true)
            .brotli(true)
            .build()
            .map_err(|e| FetchError::Unavailable(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        let transport = |e: reqwest::Error| FetchError::Transport {
            url: url.to_string(),
            message: e.to_string(),
        };

        let response = self.client.get(url).send().await.map_err(transport)?;
        let status = response.status();
        let final_url = response.url().to_string();
        debug!("GET {} -> {}", url, status);

        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(transport)?;

        Ok(FetchedPage {
            url: url.to_string(),
            final_url,
            status: status.as_u16(),
            body,
        })
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
