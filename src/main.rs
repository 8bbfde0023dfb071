//! corpus-crawler main entry point
//!
//! This is the command-line interface for the corpus crawler.

use anyhow::Context;
use clap::Parser;
use corpus_crawler::config::{load_config_with_hash, Config};
use corpus_crawler::crawler::{load_seeds, print_statistics, Orchestrator};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// corpus-crawler: a polite web crawler
///
/// Crawls outward from a list of seed URLs, honouring robots.txt and
/// per-domain crawl delays, and archives every fetched page as a WARC
/// record in the corpus directory.
#[derive(Parser, Debug)]
#[command(name = "corpus-crawler")]
#[command(version)]
#[command(about = "A polite web crawler that builds a page corpus", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Seed file to use instead of the one named in the configuration
    #[arg(long, value_name = "PATH")]
    seeds: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and seeds without crawling
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    let seed_path = cli
        .seeds
        .unwrap_or_else(|| PathBuf::from(&config.input.seed_file));

    if cli.dry_run {
        handle_dry_run(&config, &seed_path)
    } else {
        handle_crawl(&config, &seed_path).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("corpus_crawler=info,warn"),
            1 => EnvFilter::new("corpus_crawler=debug,info"),
            2 => EnvFilter::new("corpus_crawler=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: validates config and seeds, then exits
fn handle_dry_run(config: &Config, seed_path: &Path) -> anyhow::Result<()> {
    let seeds = load_seeds(seed_path)?;

    println!("=== corpus-crawler Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Workers: {}", config.crawler.workers);
    println!("  Request timeout: {:?}", config.crawler.request_timeout());
    println!(
        "  Minimum crawl delay: {:?}",
        config.crawler.minimum_crawl_delay()
    );
    match config.crawler.max_pages {
        Some(max) => println!("  Page budget: {}", max),
        None => println!("  Page budget: unlimited"),
    }
    match config.crawler.idle_timeout() {
        Some(timeout) => println!("  Idle timeout: {:?}", timeout),
        None => println!("  Idle timeout: none (runs until interrupted)"),
    }

    println!("\nUser Agent:");
    println!("  Header: {}", config.user_agent.header_value());
    println!("  robots.txt token: {}", config.user_agent.agent_token());

    println!("\nPoliteness:");
    println!(
        "  robots.txt cache capacity: {}",
        config.politeness.cache_capacity
    );

    println!("\nOutput:");
    println!("  Corpus directory: {} (cleared on start)", config.output.corpus_dir);

    println!("\nSeeds ({}) from {}:", seeds.len(), seed_path.display());
    for seed in &seeds {
        println!("  - {}", seed);
    }

    println!("\n✓ Configuration is valid");
    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: &Config, seed_path: &Path) -> anyhow::Result<()> {
    let seeds = load_seeds(seed_path)?;
    if seeds.is_empty() {
        tracing::warn!("No valid seed URLs in {}", seed_path.display());
    }

    let orchestrator = Orchestrator::from_config(config)
        .await
        .context("Failed to initialize crawler")?;
    let queued = orchestrator.seed(seeds);
    tracing::info!("Queued {} seed URLs", queued);

    let shutdown = orchestrator.shutdown_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping crawl");
            shutdown.trigger();
        }
    });

    let stats = orchestrator.run().await;
    print_statistics(&stats);

    Ok(())
}
