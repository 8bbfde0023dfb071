use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for corpus-crawler
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub politeness: PolitenessConfig,
    pub input: InputConfig,
    pub output: OutputConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Number of workers in the pool (maximum pages in flight)
    pub workers: u32,

    /// Per-request timeout for page and robots.txt fetches (seconds)
    #[serde(rename = "request-timeout-secs", default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Floor applied to every domain's crawl delay (milliseconds)
    #[serde(rename = "minimum-crawl-delay-ms", default)]
    pub minimum_crawl_delay_ms: u64,

    /// Stop after dispatching this many pages
    #[serde(rename = "max-pages", default)]
    pub max_pages: Option<u64>,

    /// Stop once the frontier has stayed empty with nothing in flight this long (seconds)
    #[serde(rename = "idle-timeout-secs", default)]
    pub idle_timeout_secs: Option<u64>,
}

impl CrawlerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn minimum_crawl_delay(&self) -> Duration {
        Duration::from_millis(self.minimum_crawl_delay_ms)
    }

    pub fn idle_timeout(&self) -> Option<Duration> {
        self.idle_timeout_secs.map(Duration::from_secs)
    }
}

fn default_request_timeout() -> u64 {
    5
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler; also the token matched against robots.txt groups
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Full `User-Agent` header value
    ///
    /// Format: `CrawlerName/Version (+ContactURL; ContactEmail)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }

    /// Product token used for robots.txt group lookups
    pub fn agent_token(&self) -> &str {
        &self.crawler_name
    }
}

/// robots.txt cache configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PolitenessConfig {
    /// Maximum number of domains whose robots rules are kept in memory
    #[serde(rename = "cache-capacity", default = "default_cache_capacity")]
    pub cache_capacity: usize,
}

impl Default for PolitenessConfig {
    fn default() -> Self {
        Self {
            cache_capacity: default_cache_capacity(),
        }
    }
}

fn default_cache_capacity() -> usize {
    1024
}

/// Input configuration
#[derive(Debug, Clone, Deserialize)]
pub struct InputConfig {
    /// Newline-delimited list of seed URLs
    #[serde(rename = "seed-file")]
    pub seed_file: String,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Directory receiving one `.warc` file per fetched page
    #[serde(rename = "corpus-dir")]
    pub corpus_dir: String,
}
