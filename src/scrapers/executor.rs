//! Rate-limited, concurrency-bounded fetch-and-extract pass over seed URLs.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt, TryStreamExt};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::fetcher::{FetchError, PageFetcher};
use super::page::PageDocument;
use super::rate_limiter::{RateLimitConfig, RateLimiter};
use crate::config::ScraperSettings;

/// A URL to crawl, with a label for logs.
#[derive(Debug, Clone, PartialEq)]
pub struct Seed {
    pub url: String,
    pub label: String,
}

impl Seed {
    pub fn new(url: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            label: label.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),
}

/// Fetches seeds through a [`PageFetcher`] and runs an extractor over each page.
#[derive(Clone)]
pub struct CrawlExecutor {
    fetcher: Arc<dyn PageFetcher>,
    limiter: RateLimiter,
    concurrency: usize,
    request_timeout: Duration,
    settle_delay: Duration,
}

impl CrawlExecutor {
    pub fn new(fetcher: Arc<dyn PageFetcher>, settings: &ScraperSettings) -> Self {
        Self {
            fetcher,
            limiter: RateLimiter::with_config(RateLimitConfig::per_minute(
                settings.max_requests_per_minute,
            )),
            concurrency: settings.max_concurrency.max(1),
            request_timeout: settings.request_timeout,
            settle_delay: settings.settle_delay,
        }
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// Crawl every seed and collect extracted records.
    ///
    /// Output order is unspecified. A timed-out request contributes nothing;
    /// any transport error aborts the run.
    pub async fn run<R, F>(&self, seeds: Vec<Seed>, extractor: F) -> Result<Vec<R>, CrawlError>
    where
        R: Send,
        F: Fn(&Seed, &PageDocument) -> Vec<R> + Sync,
    {
        let seed_count = seeds.len();
        info!(
            "Crawling {} seed(s) via {} (concurrency {})",
            seed_count,
            self.fetcher.name(),
            self.concurrency
        );

        let extractor = &extractor;
        let batches: Vec<Vec<R>> = stream::iter(seeds)
            .map(|seed| async move { self.crawl_one(seed, extractor).await })
            .buffer_unordered(self.concurrency)
            .try_collect()
            .await?;

        let records: Vec<R> = batches.into_iter().flatten().collect();
        info!(
            "Crawl finished: {} record(s) from {} seed(s)",
            records.len(),
            seed_count
        );
        Ok(records)
    }

    async fn crawl_one<R, F>(&self, seed: Seed, extractor: &F) -> Result<Vec<R>, CrawlError>
    where
        F: Fn(&Seed, &PageDocument) -> Vec<R>,
    {
        let domain = self.limiter.acquire(&seed.url).await;
        debug!("Fetching {} ({})", seed.url, seed.label);

        let page = match tokio::time::timeout(self.request_timeout, self.fetcher.fetch(&seed.url))
            .await
        {
            Ok(Ok(page)) => page,
            Ok(Err(e)) => {
                if let (Some(domain), Some(status)) = (domain.as_deref(), e.status()) {
                    if RateLimiter::is_rate_limit(status) {
                        self.limiter.report_rate_limit(domain, status).await;
                    } else if status >= 500 {
                        self.limiter.report_server_error(domain).await;
                    }
                }
                warn!("Failed to fetch {} ({}): {}", seed.url, seed.label, e);
                return Err(e.into());
            }
            Err(_) => {
                warn!(
                    "Request for {} ({}) timed out after {:?}, skipping",
                    seed.url, seed.label, self.request_timeout
                );
                return Ok(Vec::new());
            }
        };

        if let Some(domain) = domain.as_deref() {
            self.limiter.report_success(domain).await;
        }

        if !self.settle_delay.is_zero() {
            tokio::time::sleep(self.settle_delay).await;
        }

        // PageDocument is not Send; it must not live across an await.
        let records = {
            let doc = PageDocument::parse(&page.final_url, &page.body);
            extractor(&seed, &doc)
        };
        debug!("{} record(s) from {}", records.len(), seed.url);
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrapers::fetcher::test_support::ScriptedFetcher;

    fn settings() -> ScraperSettings {
        ScraperSettings {
            settle_delay: Duration::ZERO,
            max_requests_per_minute: 60_000,
            request_timeout: Duration::from_millis(200),
            ..Default::default()
        }
    }

    fn headings(_seed: &Seed, doc: &PageDocument) -> Vec<String> {
        doc.select("h1")
            .into_iter()
            .filter_map(|el| el.own_text())
            .collect()
    }

    #[tokio::test]
    async fn test_run_collects_records_from_all_seeds() {
        let fetcher = ScriptedFetcher::new()
            .with_page("https://shop.test/a", "<h1>A</h1>")
            .with_page("https://shop.test/b", "<h1>B</h1><h1>C</h1>");
        let executor = CrawlExecutor::new(Arc::new(fetcher), &settings());

        let mut records = executor
            .run(
                vec![
                    Seed::new("https://shop.test/a", "a"),
                    Seed::new("https://shop.test/b", "b"),
                ],
                headings,
            )
            .await
            .unwrap();
        records.sort();
        assert_eq!(records, vec!["A", "B", "C"]);
    }

    #[tokio::test]
    async fn test_timed_out_request_is_excluded() {
        let fetcher = ScriptedFetcher::new()
            .with_page("https://shop.test/a", "<h1>A</h1>")
            .with_hang("https://shop.test/slow");
        let executor = CrawlExecutor::new(Arc::new(fetcher), &settings());

        let records = executor
            .run(
                vec![
                    Seed::new("https://shop.test/a", "a"),
                    Seed::new("https://shop.test/slow", "slow"),
                ],
                headings,
            )
            .await
            .unwrap();
        assert_eq!(records, vec!["A"]);
    }

    #[tokio::test]
    async fn test_status_error_aborts_run() {
        let fetcher = ScriptedFetcher::new().with_status("https://shop.test/busy", 429);
        let executor = CrawlExecutor::new(Arc::new(fetcher), &settings());

        let err = executor
            .run(vec![Seed::new("https://shop.test/busy", "busy")], headings)
            .await
            .unwrap_err();
        let CrawlError::Fetch(inner) = err;
        assert_eq!(inner.status(), Some(429));

        let stats = executor.limiter().get_stats().await;
        assert_eq!(stats["shop.test"].rate_limit_hits, 1);
        assert!(stats["shop.test"].in_backoff);
    }

    #[tokio::test]
    async fn test_empty_page_is_not_an_error() {
        let fetcher = ScriptedFetcher::new().with_page("https://shop.test/empty", "<p>nothing</p>");
        let executor = CrawlExecutor::new(Arc::new(fetcher), &settings());

        let records = executor
            .run(vec![Seed::new("https://shop.test/empty", "empty")], headings)
            .await
            .unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_in_flight_fetches_are_bounded() {
        let urls: Vec<String> = (0..6).map(|i| format!("https://shop.test/{i}")).collect();
        let fetcher = urls
            .iter()
            .fold(ScriptedFetcher::new(), |f, url| f.with_page(url, "<h1>x</h1>"))
            .with_latency(Duration::from_millis(50));
        let fetcher = Arc::new(fetcher);
        let settings = ScraperSettings {
            max_concurrency: 2,
            ..settings()
        };
        let executor = CrawlExecutor::new(fetcher.clone(), &settings);

        let seeds = urls.iter().map(|url| Seed::new(url.as_str(), "page")).collect();
        let records = executor.run(seeds, headings).await.unwrap();

        assert_eq!(records.len(), 6);
        assert_eq!(fetcher.calls(), 6);
        assert_eq!(fetcher.max_in_flight(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_extraction_waits_for_settle_delay() {
        let fetcher = ScriptedFetcher::new().with_page("https://shop.test/a", "<h1>A</h1>");
        let settings = ScraperSettings {
            settle_delay: Duration::from_secs(2),
            request_timeout: Duration::from_secs(60),
            ..settings()
        };
        let executor = CrawlExecutor::new(Arc::new(fetcher), &settings);

        let start = tokio::time::Instant::now();
        let extracted_at = executor
            .run(vec![Seed::new("https://shop.test/a", "a")], |_, _| {
                vec![tokio::time::Instant::now()]
            })
            .await
            .unwrap();

        assert_eq!(extracted_at.len(), 1);
        assert!(extracted_at[0] - start >= Duration::from_secs(2));
    }
}
