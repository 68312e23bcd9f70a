//! Per-domain rate limiting state.

use std::time::Duration;

use tokio::time::Instant;

/// State for a single domain.
#[derive(Debug, Clone)]
pub struct DomainState {
    /// Current spacing between request slots.
    pub current_delay: Duration,
    /// Earliest instant the next request may start.
    pub next_slot: Option<Instant>,
    /// Consecutive successes since last rate limit.
    pub consecutive_successes: u32,
    /// Whether currently in backoff.
    pub in_backoff: bool,
    /// Total requests made.
    pub total_requests: u64,
    /// Total rate limit hits.
    pub rate_limit_hits: u64,
}

impl DomainState {
    pub fn new(base_delay: Duration) -> Self {
        Self {
            current_delay: base_delay,
            next_slot: None,
            consecutive_successes: 0,
            in_backoff: false,
            total_requests: 0,
            rate_limit_hits: 0,
        }
    }

    /// Claim the next free slot and push the following one back by the current delay.
    pub fn reserve(&mut self, now: Instant) -> Instant {
        let slot = match self.next_slot {
            Some(next) if next > now => next,
            _ => now,
        };
        self.next_slot = Some(slot + self.current_delay);
        self.total_requests += 1;
        slot
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserve_spaces_slots() {
        let now = Instant::now();
        let mut state = DomainState::new(Duration::from_secs(2));

        assert_eq!(state.reserve(now), now);
        assert_eq!(state.reserve(now), now + Duration::from_secs(2));
        assert_eq!(state.reserve(now), now + Duration::from_secs(4));
        assert_eq!(state.total_requests, 3);
        assert_eq!(state.next_slot, Some(now + Duration::from_secs(6)));
    }

    #[test]
    fn test_idle_domain_is_ready_immediately() {
        let now = Instant::now();
        let mut state = DomainState::new(Duration::from_secs(2));
        state.reserve(now);

        let later = now + Duration::from_secs(10);
        assert_eq!(state.reserve(later), later);
        assert_eq!(state.next_slot, Some(later + Duration::from_secs(2)));
    }
}
