//! Freshness policy for cached catalog records.

use std::time::Duration;

use chrono::{DateTime, Utc};

/// Whether a record last scraped at `last_scraped_at` is stale under `ttl`.
///
/// A record that was never scraped is stale. A record exactly `ttl` old is
/// still fresh.
pub fn is_stale(last_scraped_at: Option<DateTime<Utc>>, ttl: Duration) -> bool {
    is_stale_at(last_scraped_at, ttl, Utc::now())
}

/// [`is_stale`] evaluated against an explicit clock.
pub fn is_stale_at(last_scraped_at: Option<DateTime<Utc>>, ttl: Duration, now: DateTime<Utc>) -> bool {
    let Some(last) = last_scraped_at else {
        return true;
    };
    let Ok(ttl) = chrono::Duration::from_std(ttl) else {
        // A TTL too large to represent never expires.
        return false;
    };
    now.signed_duration_since(last) > ttl
}

/// Whether a scrape should run: forced, or the record is stale.
pub fn needs_refresh(force: bool, last_scraped_at: Option<DateTime<Utc>>, ttl: Duration) -> bool {
    force || is_stale(last_scraped_at, ttl)
}
