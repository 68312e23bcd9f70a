//! Rate limiter configuration.

use std::time::Duration;

/// Rate limiter tuning.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Spacing between request slots when the domain is healthy.
    pub base_delay: Duration,
    /// Lower bound when recovering from backoff.
    pub min_delay: Duration,
    /// Upper bound when backing off.
    pub max_delay: Duration,
    /// Multiplier applied on 429/503.
    pub backoff_multiplier: f64,
    /// Multiplier applied after enough consecutive successes while in backoff.
    pub recovery_multiplier: f64,
    /// Consecutive successes required before recovering.
    pub recovery_threshold: u32,
}

impl RateLimitConfig {
    /// Config that spaces requests evenly to stay at or under `per_minute`.
    pub fn per_minute(per_minute: u32) -> Self {
        let base_delay = Duration::from_secs(60) / per_minute.max(1);
        Self {
            base_delay,
            min_delay: base_delay,
            ..Default::default()
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(2),
            min_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(120),
            backoff_multiplier: 2.0,
            recovery_multiplier: 0.8,
            recovery_threshold: 5,
        }
    }
}

/// Snapshot of a domain's limiter state.
#[derive(Debug, Clone, PartialEq)]
pub struct DomainStats {
    pub current_delay: Duration,
    pub in_backoff: bool,
    pub total_requests: u64,
    pub rate_limit_hits: u64,
}
