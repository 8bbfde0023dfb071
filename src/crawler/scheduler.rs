//! Per-domain request spacing
//!
//! This module handles:
//! - Tracking the next instant each domain may be requested
//! - Claiming a dispatch slot before sleeping, so concurrent workers on one
//!   domain queue up behind each other instead of firing together
//! - Combining the robots.txt crawl delay with the configured floor

use crate::robots::MAX_CRAWL_DELAY;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

/// Rate gate keyed by domain
///
/// Each domain has a next-allowed instant. `wait_turn` claims the earliest
/// slot at or after that instant, pushes the next-allowed instant one delay
/// further, then sleeps until the claimed slot. Dispatches for one domain are
/// therefore at least one delay apart no matter how many workers race.
///
/// The map is unbounded and independent of the robots cache.
#[derive(Debug, Default)]
pub struct CrawlScheduler {
    next_allowed: Mutex<HashMap<String, Instant>>,
    minimum_delay: Duration,
}

impl CrawlScheduler {
    /// Creates a scheduler whose delays never drop below `minimum_delay`
    pub fn new(minimum_delay: Duration) -> Self {
        Self {
            next_allowed: Mutex::new(HashMap::new()),
            minimum_delay,
        }
    }

    pub fn minimum_delay(&self) -> Duration {
        self.minimum_delay
    }

    /// Calculates the delay to apply to a domain
    ///
    /// The larger of the configured floor and the robots.txt crawl delay; an
    /// absent crawl delay counts as zero. Never exceeds [`MAX_CRAWL_DELAY`].
    pub fn effective_delay(&self, crawl_delay: Option<Duration>) -> Duration {
        std::cmp::max(self.minimum_delay, crawl_delay.unwrap_or(Duration::ZERO))
            .min(MAX_CRAWL_DELAY)
    }

    /// Claims the next dispatch slot for `domain` and returns it
    ///
    /// The slot is `max(next_allowed, now)`; the domain's next-allowed instant
    /// becomes `slot + delay`, with `delay` capped at [`MAX_CRAWL_DELAY`].
    pub fn claim_slot(&self, domain: &str, delay: Duration) -> Instant {
        let delay = delay.min(MAX_CRAWL_DELAY);
        let now = Instant::now();
        let mut next_allowed = self
            .next_allowed
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let slot = match next_allowed.get(domain) {
            Some(&next) if next > now => next,
            _ => now,
        };
        let next = slot.checked_add(delay).unwrap_or(slot);
        next_allowed.insert(domain.to_string(), next);
        slot
    }

    /// Waits until `domain` may be requested again
    ///
    /// `crawl_delay` is the robots.txt delay for our agent, if any. Returns the
    /// slot that was claimed.
    pub async fn wait_turn(&self, domain: &str, crawl_delay: Option<Duration>) -> Instant {
        let delay = self.effective_delay(crawl_delay);
        let slot = self.claim_slot(domain, delay);

        if slot > Instant::now() {
            tracing::trace!(
                "Waiting {:?} before next request to {}",
                slot - Instant::now(),
                domain
            );
        }
        tokio::time::sleep_until(slot).await;

        slot
    }

    /// Returns the next instant `domain` may be requested, if it has been seen
    pub fn next_allowed(&self, domain: &str) -> Option<Instant> {
        self.next_allowed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(domain)
            .copied()
    }

    /// Number of domains with scheduling state
    pub fn tracked_domains(&self) -> usize {
        self.next_allowed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
