//! Crawler module for web page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching behind the [`Transport`] seam
//! - HTML link extraction
//! - Per-domain request spacing
//! - The worker pool that ties them together

mod fetcher;
mod orchestrator;
mod parser;
mod scheduler;
mod seeds;
pub mod stats;

pub use fetcher::{build_http_client, FetchError, FetchedResponse, ReqwestTransport, Transport};
pub use orchestrator::{
    CrawlServices, Orchestrator, OrchestratorSettings, ShutdownHandle, TaskError,
};
pub use parser::{HtmlLinkExtractor, LinkExtractor};
pub use scheduler::CrawlScheduler;
pub use seeds::load_seeds;
pub use stats::{print_statistics, CrawlStats, StatsRecorder};

use crate::config::Config;
use crate::Result;
use std::path::Path;

/// Runs a complete crawl operation
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Read the seed file (`seeds` overrides the configured one)
/// 2. Build the HTTP client and clear the corpus directory
/// 3. Crawl until the page budget is spent or the idle timeout expires
///
/// Startup failures are returned as errors before any request is made.
pub async fn crawl(config: &Config, seeds: Option<&Path>) -> Result<CrawlStats> {
    let seed_path = seeds.unwrap_or_else(|| Path::new(&config.input.seed_file));
    let seed_urls = load_seeds(seed_path)?;
    tracing::info!("Loaded {} seed URLs from {}", seed_urls.len(), seed_path.display());

    let orchestrator = Orchestrator::from_config(config).await?;
    orchestrator.seed(seed_urls);
    Ok(orchestrator.run().await)
}
