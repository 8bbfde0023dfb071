//! corpus-crawler: a polite, concurrent web crawler
//!
//! This crate crawls outward from a list of seed URLs while respecting
//! robots.txt rules and per-domain crawl delays, and archives every fetched
//! page as a WARC-style record on disk.

pub mod config;
pub mod crawler;
pub mod document;
pub mod frontier;
pub mod robots;
pub mod url;

use thiserror::Error;

/// Main error type for crawl startup and orchestration
///
/// Per-page failures never surface here; they are contained by the worker
/// that hit them (see [`crawler::TaskError`]).
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to read seed file {path}: {source}")]
    Seeds {
        path: String,
        source: std::io::Error,
    },

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,
}

/// Result type alias for crawl operations
pub type Result<T> = std::result::Result<T, CrawlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CrawlStats, Orchestrator};
pub use document::{DocumentRecord, DocumentWriter};
pub use frontier::{Frontier, VisitedSet};
pub use robots::{PolitenessCache, RobotsRules};
pub use url::{domain_key, normalize_url, resolve_link};
