//! Adaptive per-domain rate limiter.
//!
//! Each request reserves a slot under the write lock, so concurrent workers
//! sharing a limiter never start two requests to the same domain closer than
//! the current delay. Backs off on 429/503, gradually recovers on success.

mod config;
mod domain_state;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use url::Url;

pub use config::{DomainStats, RateLimitConfig};
use domain_state::DomainState;

/// Adaptive rate limiter that tracks per-domain request timing.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    config: RateLimitConfig,
    domains: Arc<RwLock<HashMap<String, DomainState>>>,
}

impl RateLimiter {
    /// Create a new rate limiter with default config.
    pub fn new() -> Self {
        Self::with_config(RateLimitConfig::default())
    }

    /// Create a new rate limiter with custom config.
    pub fn with_config(config: RateLimitConfig) -> Self {
        Self {
            config,
            domains: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Extract domain from URL.
    pub fn extract_domain(url: &str) -> Option<String> {
        Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(|s| s.to_string()))
    }

    /// Reserve the next request slot for the URL's domain and wait for it.
    ///
    /// Returns the domain, or None for URLs without a host (which are not limited).
    pub async fn acquire(&self, url: &str) -> Option<String> {
        let domain = Self::extract_domain(url)?;

        let slot = {
            let mut domains = self.domains.write().await;
            domains
                .entry(domain.clone())
                .or_insert_with(|| DomainState::new(self.config.base_delay))
                .reserve(Instant::now())
        };

        let now = Instant::now();
        if slot > now {
            debug!("Rate limiting {}: waiting {:?}", domain, slot - now);
            tokio::time::sleep_until(slot).await;
        }

        Some(domain)
    }

    /// Report a successful request - may decrease delay.
    pub async fn report_success(&self, domain: &str) {
        let mut domains = self.domains.write().await;
        if let Some(state) = domains.get_mut(domain) {
            state.consecutive_successes += 1;

            // Recover from backoff after threshold successes
            if state.in_backoff && state.consecutive_successes >= self.config.recovery_threshold {
                let new_delay = Duration::from_secs_f64(
                    state.current_delay.as_secs_f64() * self.config.recovery_multiplier,
                );
                state.current_delay = new_delay.max(self.config.min_delay);

                if state.current_delay <= self.config.base_delay {
                    state.in_backoff = false;
                    state.current_delay = self.config.base_delay;
                    info!("Domain {} recovered from rate limit backoff", domain);
                } else {
                    debug!(
                        "Domain {} delay reduced to {:?}",
                        domain, state.current_delay
                    );
                }

                state.consecutive_successes = 0;
            }
        }
    }

    /// Check if a status code is a rate limit signal.
    pub fn is_rate_limit(status_code: u16) -> bool {
        matches!(status_code, 429 | 503)
    }

    /// Report a rate limit hit (429 or 503) - increases delay.
    pub async fn report_rate_limit(&self, domain: &str, status_code: u16) {
        let mut domains = self.domains.write().await;
        if let Some(state) = domains.get_mut(domain) {
            state.rate_limit_hits += 1;
            state.consecutive_successes = 0;
            state.in_backoff = true;

            let new_delay = Duration::from_secs_f64(
                state.current_delay.as_secs_f64() * self.config.backoff_multiplier,
            );
            state.current_delay = new_delay.min(self.config.max_delay);

            warn!(
                "Rate limited by {} (HTTP {}), backing off to {:?}",
                domain, status_code, state.current_delay
            );
        }
    }

    /// Report a server error (5xx other than 503) - mild backoff.
    pub async fn report_server_error(&self, domain: &str) {
        let mut domains = self.domains.write().await;
        if let Some(state) = domains.get_mut(domain) {
            state.consecutive_successes = 0;
            let new_delay = Duration::from_secs_f64(state.current_delay.as_secs_f64() * 1.5);
            state.current_delay = new_delay.min(self.config.max_delay);
            debug!(
                "Server error for {}, delay increased to {:?}",
                domain, state.current_delay
            );
        }
    }

    /// Get statistics for all domains.
    pub async fn get_stats(&self) -> HashMap<String, DomainStats> {
        let domains = self.domains.read().await;
        domains
            .iter()
            .map(|(k, v)| {
                (
                    k.clone(),
                    DomainStats {
                        current_delay: v.current_delay,
                        in_backoff: v.in_backoff,
                        total_requests: v.total_requests,
                        rate_limit_hits: v.rate_limit_hits,
                    },
                )
            })
            .collect()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_domain() {
        assert_eq!(
            RateLimiter::extract_domain("https://www.worldofbooks.com/en-gb/books"),
            Some("www.worldofbooks.com".to_string())
        );
        assert_eq!(RateLimiter::extract_domain("not a url"), None);
    }

    #[test]
    fn test_per_minute_spacing() {
        let config = RateLimitConfig::per_minute(30);
        assert_eq!(config.base_delay, Duration::from_secs(2));
        let config = RateLimitConfig::per_minute(120);
        assert_eq!(config.base_delay, Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_concurrent_acquires_are_spaced() {
        let limiter = RateLimiter::with_config(RateLimitConfig::per_minute(600));
        let start = Instant::now();

        let handles: Vec<_> = (0..3)
            .map(|i| {
                let limiter = limiter.clone();
                tokio::spawn(async move {
                    limiter.acquire(&format!("https://example.com/{i}")).await;
                    Instant::now()
                })
            })
            .collect();

        let mut times = Vec::new();
        for h in handles {
            times.push(h.await.unwrap() - start);
        }
        times.sort();

        assert!(times[0] < Duration::from_millis(50));
        assert!(times[1] >= Duration::from_millis(100));
        assert!(times[2] >= Duration::from_millis(200));
    }

    #[tokio::test]
    async fn test_backoff_on_rate_limit() {
        let limiter = RateLimiter::with_config(RateLimitConfig {
            base_delay: Duration::from_millis(100),
            min_delay: Duration::from_millis(100),
            backoff_multiplier: 2.0,
            recovery_threshold: 2,
            recovery_multiplier: 0.5,
            ..Default::default()
        });

        limiter.acquire("https://example.com/1").await;
        limiter.report_rate_limit("example.com", 429).await;

        let stats = limiter.get_stats().await;
        let domain_stats = stats.get("example.com").unwrap();
        assert_eq!(domain_stats.current_delay, Duration::from_millis(200));
        assert!(domain_stats.in_backoff);
        assert_eq!(domain_stats.rate_limit_hits, 1);

        limiter.report_success("example.com").await;
        limiter.report_success("example.com").await;

        let stats = limiter.get_stats().await;
        let domain_stats = stats.get("example.com").unwrap();
        assert!(!domain_stats.in_backoff);
        assert_eq!(domain_stats.current_delay, Duration::from_millis(100));
    }

    #[test]
    fn test_rate_limit_statuses() {
        assert!(RateLimiter::is_rate_limit(429));
        assert!(RateLimiter::is_rate_limit(503));
        assert!(!RateLimiter::is_rate_limit(500));
    }
}
