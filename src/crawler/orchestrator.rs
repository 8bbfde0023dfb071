//! Crawl orchestration
//!
//! A fixed pool of worker tasks shares one frontier. Each worker repeatedly
//! pops a URL and runs it through the per-page protocol:
//!
//! 1. derive the domain key
//! 2. resolve robots.txt rules (cache hit, or fetch and populate)
//! 3. check that our agent may fetch the path
//! 4. wait for the domain's next dispatch slot
//! 5. fetch with a bounded timeout and validate status and content type
//! 6. extract links, drop seen or disallowed ones, enqueue the rest
//! 7. archive the response
//!
//! A failure at any step abandons that URL only, a panic included. There are
//! no retries. A redirect is not followed; its target is treated as a
//! discovered link.

use crate::config::Config;
use crate::crawler::parser::{HtmlLinkExtractor, LinkExtractor};
use crate::crawler::scheduler::CrawlScheduler;
use crate::crawler::stats::{CrawlStats, StatsRecorder};
use crate::crawler::{FetchError, ReqwestTransport, Transport};
use crate::document::{DocumentRecord, DocumentWriter};
use crate::frontier::{Frontier, VisitedSet};
use crate::robots::{self, PolitenessCache, RobotsError, RobotsFetcher, RobotsRules};
use crate::url::{domain_key, resolve_link};
use crate::Result;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use url::Url;

/// How often an idle worker re-checks the frontier
const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Dispatches between progress log lines
const PROGRESS_INTERVAL: u64 = 100;

/// Why a single URL was abandoned
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("Invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("robots.txt unavailable for {domain}: {source}")]
    Robots { domain: String, source: RobotsError },

    #[error("{url} is disallowed by robots.txt")]
    Disallowed { url: String },

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("{url} returned status {status}")]
    Status { url: String, status: u16 },

    #[error("{url} has unsupported content type {content_type}")]
    ContentType { url: String, content_type: String },

    #[error("{url} redirected to {location}")]
    Redirected { url: String, location: String },

    #[error("Failed to write record for {url}: {source}")]
    Write {
        url: String,
        source: std::io::Error,
    },

    #[error("{url} abandoned by shutdown")]
    Cancelled { url: String },

    #[error("Task for {url} panicked: {message}")]
    Panicked { url: String, message: String },
}

/// Tunables for one crawl run
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    /// Number of worker tasks, and so the maximum number of URLs in flight
    pub workers: usize,

    /// Upper bound on a single page fetch
    pub request_timeout: Duration,

    /// Product token matched against robots.txt groups
    pub agent_token: String,

    /// Stop after dispatching this many URLs
    pub max_pages: Option<u64>,

    /// Stop once there has been nothing to do for this long
    pub idle_timeout: Option<Duration>,
}

impl OrchestratorSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            workers: config.crawler.workers as usize,
            request_timeout: config.crawler.request_timeout(),
            agent_token: config.user_agent.agent_token().to_string(),
            max_pages: config.crawler.max_pages,
            idle_timeout: config.crawler.idle_timeout(),
        }
    }
}

/// Shared services every worker uses
///
/// Each service is constructed once and shared; the frontier, visited set,
/// robots cache and scheduler each guard their own state.
#[derive(Clone)]
pub struct CrawlServices {
    pub frontier: Arc<Frontier>,
    pub visited: Arc<VisitedSet>,
    pub politeness: Arc<PolitenessCache>,
    pub scheduler: Arc<CrawlScheduler>,
    pub transport: Arc<dyn Transport>,
    pub extractor: Arc<dyn LinkExtractor>,
    pub writer: DocumentWriter,
}

impl CrawlServices {
    /// Wires the services around an existing transport and writer
    pub fn new(config: &Config, transport: Arc<dyn Transport>, writer: DocumentWriter) -> Self {
        let fetcher = RobotsFetcher::new(Arc::clone(&transport), config.crawler.request_timeout());

        Self {
            frontier: Arc::new(Frontier::new()),
            visited: Arc::new(VisitedSet::new()),
            politeness: Arc::new(PolitenessCache::new(
                config.politeness.cache_capacity,
                fetcher,
            )),
            scheduler: Arc::new(CrawlScheduler::new(config.crawler.minimum_crawl_delay())),
            transport,
            extractor: Arc::new(HtmlLinkExtractor),
            writer,
        }
    }

    /// Builds the HTTP transport and prepares the corpus directory
    pub async fn from_config(config: &Config) -> Result<Self> {
        let transport: Arc<dyn Transport> = Arc::new(ReqwestTransport::new(&config.user_agent)?);
        let writer = DocumentWriter::prepare(&config.output.corpus_dir).await?;
        Ok(Self::new(config, transport, writer))
    }
}

/// Cloneable stop signal for a running crawl
///
/// Workers finish the fetch they are on and then exit. A URL still waiting
/// for its domain's dispatch slot is abandoned.
#[derive(Debug, Clone, Default)]
pub struct ShutdownHandle(CancellationToken);

impl ShutdownHandle {
    pub fn trigger(&self) {
        self.0.cancel();
    }

    pub fn is_triggered(&self) -> bool {
        self.0.is_cancelled()
    }

    /// Completes once the handle has been triggered
    pub async fn triggered(&self) {
        self.0.cancelled().await;
    }
}

/// Marks a worker as busy until dropped
struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Runs a crawl over a fixed pool of workers
pub struct Orchestrator {
    context: Arc<CrawlContext>,
}

struct CrawlContext {
    settings: OrchestratorSettings,
    services: CrawlServices,
    stats: StatsRecorder,
    shutdown: ShutdownHandle,
    /// Dispatches claimed against `max_pages`
    claimed: AtomicU64,
    /// Workers holding, or about to pop, a URL
    in_flight: AtomicUsize,
    last_activity: Mutex<Instant>,
}

impl Orchestrator {
    pub fn new(settings: OrchestratorSettings, services: CrawlServices) -> Self {
        Self {
            context: Arc::new(CrawlContext {
                settings,
                services,
                stats: StatsRecorder::new(),
                shutdown: ShutdownHandle::default(),
                claimed: AtomicU64::new(0),
                in_flight: AtomicUsize::new(0),
                last_activity: Mutex::new(Instant::now()),
            }),
        }
    }

    /// Creates an orchestrator with production services
    ///
    /// The corpus directory is cleared and recreated here, before any work
    /// begins.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let services = CrawlServices::from_config(config).await?;
        Ok(Self::new(OrchestratorSettings::from_config(config), services))
    }

    /// Adds seed URLs to the frontier, returning how many were new
    pub fn seed(&self, seeds: impl IntoIterator<Item = Url>) -> usize {
        let services = &self.context.services;
        let mut added = 0;
        for seed in seeds {
            if services.visited.add(seed.as_str()) {
                services.frontier.put(seed.as_str());
                added += 1;
            }
        }
        added
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.context.shutdown.clone()
    }

    pub fn stats(&self) -> CrawlStats {
        self.context.stats.snapshot()
    }

    /// Runs the worker pool until the crawl ends
    ///
    /// The crawl ends when the shutdown handle is triggered, the page budget
    /// is spent, or the frontier has stayed empty with nothing in flight for
    /// the idle timeout. Without an idle timeout or budget the crawl runs
    /// until shut down. Once the budget is spent, URLs already dispatched
    /// still run to completion.
    ///
    /// A worker that dies is replaced until shutdown.
    pub async fn run(&self) -> CrawlStats {
        let context = &self.context;
        let start_time = Instant::now();

        tracing::info!(
            "Starting crawl with {} workers, {} URLs in frontier",
            context.settings.workers,
            context.services.frontier.len()
        );
        context.touch();

        let pool_size = context.settings.workers.max(1);
        let mut workers = JoinSet::new();
        for worker_id in 0..pool_size {
            workers.spawn(Arc::clone(context).worker_loop(worker_id));
        }

        let mut next_id = pool_size;
        while let Some(result) = workers.join_next().await {
            if let Err(e) = result {
                tracing::error!("Worker task failed: {}", e);
                if !context.shutdown.is_triggered() && !context.budget_spent() {
                    workers.spawn(Arc::clone(context).worker_loop(next_id));
                    next_id += 1;
                }
            }
        }

        if context.budget_spent() {
            tracing::info!("Page budget reached, crawl stopped");
        }
        let stats = context.stats.snapshot();
        tracing::info!(
            "Crawl completed: {} URLs dispatched, {} documents written in {:?}",
            stats.dispatched,
            stats.written,
            start_time.elapsed()
        );
        stats
    }
}

impl CrawlContext {
    async fn worker_loop(self: Arc<Self>, worker_id: usize) {
        tracing::trace!("Worker {} started", worker_id);

        loop {
            if self.shutdown.is_triggered() || self.budget_spent() {
                break;
            }

            let in_flight = InFlight::enter(&self.in_flight);
            let Some(url) = self.services.frontier.get() else {
                drop(in_flight);
                if self.is_idle() {
                    tracing::info!("Frontier idle, stopping crawl");
                    self.shutdown.trigger();
                    break;
                }
                tokio::time::sleep(IDLE_POLL_INTERVAL).await;
                continue;
            };

            let Some(dispatched) = self.claim_dispatch() else {
                // Lost the race for the last budget slot
                self.services.frontier.put(url);
                continue;
            };
            self.stats.record_dispatched();
            if dispatched % PROGRESS_INTERVAL == 0 {
                tracing::info!(
                    "Progress: {} URLs dispatched, {} in frontier",
                    dispatched,
                    self.services.frontier.len()
                );
            }

            match self.run_task(&url).await {
                Ok(()) => self.stats.record_written(),
                Err(e @ TaskError::Panicked { .. }) => {
                    tracing::error!("{}", e);
                    self.record_failure(&e);
                }
                Err(e) => {
                    tracing::debug!("Abandoned {}: {}", url, e);
                    self.record_failure(&e);
                }
            }

            self.touch();
            drop(in_flight);
        }

        tracing::trace!("Worker {} stopped", worker_id);
    }

    /// Runs one URL on its own task so a panic abandons only that URL
    async fn run_task(self: &Arc<Self>, url: &str) -> std::result::Result<(), TaskError> {
        let context = Arc::clone(self);
        let task_url = url.to_string();
        match tokio::spawn(async move { context.process_url(&task_url).await }).await {
            Ok(result) => result,
            Err(e) => Err(TaskError::Panicked {
                url: url.to_string(),
                message: e.to_string(),
            }),
        }
    }

    async fn process_url(&self, raw: &str) -> std::result::Result<(), TaskError> {
        let url = Url::parse(raw).map_err(|e| TaskError::InvalidUrl {
            url: raw.to_string(),
            reason: e.to_string(),
        })?;
        let domain = domain_key(&url).ok_or_else(|| TaskError::InvalidUrl {
            url: raw.to_string(),
            reason: "no crawlable domain".to_string(),
        })?;
        let agent = self.settings.agent_token.as_str();

        let rules = self
            .services
            .politeness
            .resolve(&domain)
            .await
            .map_err(|source| TaskError::Robots {
                domain: domain.clone(),
                source,
            })?;

        if !robots::is_allowed(&rules, &url, agent) {
            return Err(TaskError::Disallowed {
                url: raw.to_string(),
            });
        }

        tokio::select! {
            biased;
            _ = self.services.scheduler.wait_turn(&domain, rules.crawl_delay(agent)) => {}
            _ = self.shutdown.triggered() => {
                return Err(TaskError::Cancelled {
                    url: raw.to_string(),
                });
            }
        }

        tracing::debug!("Fetching {}", url);
        let response = self
            .services
            .transport
            .fetch(&url, self.settings.request_timeout)
            .await?;

        if let Some(location) = response.redirect_location() {
            let location = location.to_string();
            let enqueued = self
                .enqueue_links(&url, &domain, &rules, vec![location.clone()])
                .await;
            self.stats.record_links_enqueued(enqueued);
            return Err(TaskError::Redirected {
                url: raw.to_string(),
                location,
            });
        }
        if !response.is_success() {
            return Err(TaskError::Status {
                url: raw.to_string(),
                status: response.status,
            });
        }
        if !response.is_markup() {
            return Err(TaskError::ContentType {
                url: raw.to_string(),
                content_type: response.content_type().unwrap_or("none").to_string(),
            });
        }

        let links = self
            .services
            .extractor
            .extract_links(&String::from_utf8_lossy(&response.body));
        let enqueued = self.enqueue_links(&url, &domain, &rules, links).await;
        self.stats.record_links_enqueued(enqueued);

        let record = DocumentRecord::from_response(url, response);
        let path = self
            .services
            .writer
            .write(&record)
            .await
            .map_err(|source| TaskError::Write {
                url: raw.to_string(),
                source,
            })?;

        tracing::debug!(
            "Archived {} to {} ({} new links)",
            record.url(),
            path.display(),
            enqueued
        );
        Ok(())
    }

    /// Filters discovered links and adds the survivors to the frontier
    ///
    /// A link is dropped when it has been seen before, or when its domain's
    /// rules are already known and disallow it. Rules are only consulted from
    /// the cache here; unknown domains are checked when their URL is popped.
    async fn enqueue_links(
        &self,
        page: &Url,
        page_domain: &str,
        page_rules: &Arc<RobotsRules>,
        links: Vec<String>,
    ) -> u64 {
        let agent = self.settings.agent_token.as_str();
        let mut known_rules: HashMap<String, Option<Arc<RobotsRules>>> = HashMap::new();
        known_rules.insert(page_domain.to_string(), Some(Arc::clone(page_rules)));

        let mut enqueued = 0;
        for href in links {
            let Some(link) = resolve_link(&href, page) else {
                continue;
            };
            if self.services.visited.contains(link.as_str()) {
                continue;
            }
            let Some(domain) = domain_key(&link) else {
                continue;
            };

            let rules = match known_rules.get(&domain) {
                Some(rules) => rules.clone(),
                None => {
                    let rules = self.services.politeness.cached(&domain).await;
                    known_rules.insert(domain, rules.clone());
                    rules
                }
            };
            if let Some(rules) = rules {
                if !robots::is_allowed(&rules, &link, agent) {
                    tracing::trace!("Dropping disallowed link {}", link);
                    continue;
                }
            }

            if self.services.visited.add(link.as_str()) {
                self.services.frontier.put(link.as_str());
                enqueued += 1;
            }
        }
        enqueued
    }

    fn record_failure(&self, error: &TaskError) {
        match error {
            TaskError::Disallowed { .. } => self.stats.record_disallowed(),
            TaskError::Robots { .. } => self.stats.record_robots_failure(),
            TaskError::Fetch(_) => self.stats.record_fetch_failure(),
            TaskError::Status { .. } | TaskError::ContentType { .. } => {
                self.stats.record_rejected()
            }
            TaskError::Redirected { .. } => self.stats.record_redirected(),
            TaskError::InvalidUrl { .. } => self.stats.record_invalid_url(),
            TaskError::Write { .. } => self.stats.record_write_failure(),
            TaskError::Cancelled { .. } => self.stats.record_cancelled(),
            TaskError::Panicked { .. } => self.stats.record_panicked(),
        }
    }

    /// Claims one dispatch against the page budget
    ///
    /// Returns the running dispatch count, or `None` once the budget is spent.
    fn claim_dispatch(&self) -> Option<u64> {
        let previous = match self.settings.max_pages {
            Some(max) => self
                .claimed
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                    (n < max).then_some(n + 1)
                })
                .ok()?,
            None => self.claimed.fetch_add(1, Ordering::SeqCst),
        };
        Some(previous + 1)
    }

    fn budget_spent(&self) -> bool {
        self.settings
            .max_pages
            .is_some_and(|max| self.claimed.load(Ordering::SeqCst) >= max)
    }

    fn is_idle(&self) -> bool {
        let Some(idle_timeout) = self.settings.idle_timeout else {
            return false;
        };
        self.services.frontier.is_empty()
            && self.in_flight.load(Ordering::SeqCst) == 0
            && self
                .last_activity
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .elapsed()
                >= idle_timeout
    }

    fn touch(&self) {
        *self
            .last_activity
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Instant::now();
    }
}
