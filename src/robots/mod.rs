//! Robots.txt handling module
//!
//! This module provides functionality for fetching, parsing, and caching
//! robots.txt files. Rules are fetched once per domain and kept in a bounded
//! LRU cache shared by every worker.

mod cache;
mod lru;
mod parser;

pub use cache::PolitenessCache;
pub use lru::LruCache;
pub use parser::{
    Directives, RobotsRules, Rule, RuleKey, UnknownRuleKey, MAX_CRAWL_DELAY, WILDCARD_AGENT,
};

use crate::crawler::{FetchError, Transport};
use crate::url::robots_url;
use crate::UrlError;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Redirect hops followed when fetching robots.txt
const MAX_ROBOTS_REDIRECTS: usize = 5;

/// Why robots.txt for a domain could not be obtained
///
/// Every variant is treated as "disallow everything" for the domain.
#[derive(Debug, Error)]
pub enum RobotsError {
    #[error("Invalid robots.txt location: {0}")]
    InvalidUrl(#[from] UrlError),

    #[error("robots.txt for {domain} returned status {status}")]
    Status { domain: String, status: u16 },

    #[error("robots.txt for {domain} redirected too many times")]
    TooManyRedirects { domain: String },

    #[error(transparent)]
    Transport(#[from] FetchError),
}

/// Fetches and parses `<domain>/robots.txt`
#[derive(Clone)]
pub struct RobotsFetcher {
    transport: Arc<dyn Transport>,
    timeout: Duration,
}

impl RobotsFetcher {
    pub fn new(transport: Arc<dyn Transport>, timeout: Duration) -> Self {
        Self { transport, timeout }
    }

    /// Fetches the robots.txt of a domain key
    ///
    /// Up to five redirects are followed. Any other non-2xx status is a
    /// failure, including 404.
    pub async fn fetch(&self, domain: &str) -> Result<RobotsRules, RobotsError> {
        let mut url = robots_url(domain)?;

        for _ in 0..=MAX_ROBOTS_REDIRECTS {
            let response = self.transport.fetch(&url, self.timeout).await?;

            if let Some(next) = response
                .redirect_location()
                .and_then(|location| url.join(location).ok())
            {
                tracing::trace!("robots.txt for {} redirected to {}", domain, next);
                url = next;
                continue;
            }

            if !response.is_success() {
                return Err(RobotsError::Status {
                    domain: domain.to_string(),
                    status: response.status,
                });
            }

            return Ok(RobotsRules::parse(&String::from_utf8_lossy(&response.body)));
        }

        Err(RobotsError::TooManyRedirects {
            domain: domain.to_string(),
        })
    }
}

impl std::fmt::Debug for RobotsFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RobotsFetcher")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// Checks if a URL is allowed by robots.txt
///
/// The path and query of `url` are matched against the agent's group.
pub fn is_allowed(rules: &RobotsRules, url: &Url, user_agent: &str) -> bool {
    let target = match url.query() {
        Some(query) => format!("{}?{}", url.path(), query),
        None => url.path().to_string(),
    };
    rules.is_allowed(user_agent, &target)
}
