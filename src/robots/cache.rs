//! Shared robots.txt cache
//!
//! One [`PolitenessCache`] is shared by all workers. A lookup that misses
//! fetches robots.txt while holding the cache lock, so concurrent workers on
//! the same uncached domain trigger exactly one fetch.

use crate::robots::lru::LruCache;
use crate::robots::{RobotsError, RobotsFetcher, RobotsRules};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Bounded domain -> robots rules cache
#[derive(Debug)]
pub struct PolitenessCache {
    entries: Mutex<LruCache<String, Arc<RobotsRules>>>,
    fetcher: RobotsFetcher,
    capacity: usize,
}

impl PolitenessCache {
    pub fn new(capacity: usize, fetcher: RobotsFetcher) -> Self {
        let entries = LruCache::new(capacity);
        let capacity = entries.capacity();
        Self {
            entries: Mutex::new(entries),
            fetcher,
            capacity,
        }
    }

    /// Returns the rules for `domain`, fetching them on a miss
    ///
    /// The check, fetch and insert happen under a single lock. A failed fetch
    /// is returned to the caller and not cached, so the next miss retries.
    pub async fn resolve(&self, domain: &str) -> Result<Arc<RobotsRules>, RobotsError> {
        let mut entries = self.entries.lock().await;

        if let Some(rules) = entries.get(domain) {
            tracing::trace!("robots cache hit for {}", domain);
            return Ok(Arc::clone(rules));
        }

        tracing::debug!("Fetching robots.txt for {}", domain);
        let rules = Arc::new(self.fetcher.fetch(domain).await?);

        if let Some((evicted, _)) = entries.put(domain.to_string(), Arc::clone(&rules)) {
            tracing::trace!("Evicted robots rules for {}", evicted);
        }

        Ok(rules)
    }

    /// Returns the cached rules for `domain` without fetching
    ///
    /// A hit refreshes the entry's recency.
    pub async fn cached(&self, domain: &str) -> Option<Arc<RobotsRules>> {
        self.entries.lock().await.get(domain).cloned()
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::ReqwestTransport;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn cache(capacity: usize) -> PolitenessCache {
        let transport = ReqwestTransport::from_client(reqwest::Client::new());
        let fetcher = RobotsFetcher::new(Arc::new(transport), Duration::from_secs(5));
        PolitenessCache::new(capacity, fetcher)
    }

    async fn robots_server(body: &str, expected_fetches: u64) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .expect(expected_fetches)
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn test_resolve_populates_and_hits() {
        let server = robots_server("User-agent: *\nDisallow: /admin\n", 1).await;
        let cache = cache(4);

        let first = cache.resolve(&server.uri()).await.unwrap();
        let second = cache.resolve(&server.uri()).await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert!(!first.is_allowed("bot", "/admin"));
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_concurrent_resolve_fetches_once() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("User-agent: *\nAllow: /\n")
                    .set_delay(Duration::from_millis(100)),
            )
            .expect(1)
            .mount(&server)
            .await;

        let cache = Arc::new(cache(4));
        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = Arc::clone(&cache);
            let domain = server.uri();
            handles.push(tokio::spawn(async move { cache.resolve(&domain).await }));
        }

        for handle in handles {
            assert!(handle.await.unwrap().is_ok());
        }
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_failure_is_not_cached() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(ResponseTemplate::new(503))
            .expect(2)
            .mount(&server)
            .await;

        let cache = cache(4);
        assert!(cache.resolve(&server.uri()).await.is_err());
        assert!(cache.cached(&server.uri()).await.is_none());
        assert!(cache.resolve(&server.uri()).await.is_err());
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_cached_never_fetches() {
        let server = robots_server("User-agent: *\nAllow: /\n", 0).await;
        let cache = cache(4);

        assert!(cache.cached(&server.uri()).await.is_none());
    }

    #[tokio::test]
    async fn test_eviction_refetches_least_recent_domain() {
        let first = robots_server("User-agent: *\nAllow: /\n", 2).await;
        let second = robots_server("User-agent: *\nAllow: /\n", 1).await;
        let cache = cache(1);

        cache.resolve(&first.uri()).await.unwrap();
        cache.resolve(&second.uri()).await.unwrap();
        assert_eq!(cache.len().await, 1);
        assert!(cache.cached(&first.uri()).await.is_none());

        // Evicted, so this goes back to the network
        cache.resolve(&first.uri()).await.unwrap();
        assert_eq!(cache.len().await, cache.capacity());
    }
}
