//! Page fetch transports.

use async_trait::async_trait;
use thiserror::Error;

/// A page body as delivered by a transport.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// URL that was requested.
    pub url: String,
    /// URL after redirects.
    pub final_url: String,
    pub status: u16,
    pub body: String,
}

/// Transport-level failure.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("transport unavailable: {0}")]
    Unavailable(String),
}

impl FetchError {
    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Something that can load a page and hand back its HTML once the network is quiet.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Load `url`. Non-2xx responses are errors.
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError>;

    /// Short transport name for logs.
    fn name(&self) -> &'static str;
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use super::*;

    #[derive(Clone)]
    enum Scripted {
        Page(String),
        Status(u16),
        Hang,
    }

    /// In-memory fetcher serving canned responses. Unknown URLs are 404s.
    #[derive(Default)]
    pub(crate) struct ScriptedFetcher {
        responses: Mutex<HashMap<String, Scripted>>,
        latency: Duration,
        calls: AtomicUsize,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    /// Counts a fetch as in flight until dropped.
    struct InFlight<'a>(&'a AtomicUsize);

    impl Drop for InFlight<'_> {
        fn drop(&mut self) {
            self.0.fetch_sub(1, Ordering::SeqCst);
        }
    }

    impl ScriptedFetcher {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        pub(crate) fn with_page(self, url: &str, body: &str) -> Self {
            self.set(url, Scripted::Page(body.to_string()));
            self
        }

        pub(crate) fn with_status(self, url: &str, status: u16) -> Self {
            self.set(url, Scripted::Status(status));
            self
        }

        /// Never answer `url`.
        pub(crate) fn with_hang(self, url: &str) -> Self {
            self.set(url, Scripted::Hang);
            self
        }

        /// Delay every answer by `latency`.
        pub(crate) fn with_latency(mut self, latency: Duration) -> Self {
            self.latency = latency;
            self
        }

        pub(crate) fn set_page(&self, url: &str, body: &str) {
            self.set(url, Scripted::Page(body.to_string()));
        }

        /// Number of fetches attempted so far.
        pub(crate) fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        /// Most fetches that were running at the same time.
        pub(crate) fn max_in_flight(&self) -> usize {
            self.max_in_flight.load(Ordering::SeqCst)
        }

        fn set(&self, url: &str, response: Scripted) {
            self.responses
                .lock()
                .unwrap()
                .insert(url.to_string(), response);
        }
    }

    #[async_trait]
    impl PageFetcher for ScriptedFetcher {
        async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            let _guard = InFlight(&self.in_flight);
            self.max_in_flight.fetch_max(running, Ordering::SeqCst);

            if !self.latency.is_zero() {
                tokio::time::sleep(self.latency).await;
            }

            let response = self.responses.lock().unwrap().get(url).cloned();
            match response {
                Some(Scripted::Page(body)) => Ok(FetchedPage {
                    url: url.to_string(),
                    final_url: url.to_string(),
                    status: 200,
                    body,
                }),
                Some(Scripted::Status(status)) => Err(FetchError::Status {
                    url: url.to_string(),
                    status,
                }),
                Some(Scripted::Hang) => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Err(FetchError::Unavailable("hung".to_string()))
                }
                None => Err(FetchError::Status {
                    url: url.to_string(),
                    status: 404,
                }),
            }
        }

        fn name(&self) -> &'static str {
            "scripted"
        }
    }
}
