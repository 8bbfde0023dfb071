//! HTTP fetcher implementation
//!
//! This module defines the transport seam the crawler fetches through, for
//! both robots.txt and pages:
//! - [`Transport`]: `fetch(url, timeout) -> response | failure`
//! - [`ReqwestTransport`]: the production implementation over reqwest
//! - Error classification into timeout / connection / other failures

use crate::config::UserAgentConfig;
use async_trait::async_trait;
use reqwest::{redirect, Client};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Content types the crawler archives and parses for links
const MARKUP_CONTENT_TYPES: &[&str] = &[
    "text/html",
    "application/xhtml+xml",
    "application/xml",
    "text/xml",
];

/// A complete HTTP response as seen by the crawler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedResponse {
    /// HTTP status code
    pub status: u16,

    /// Full status line, e.g. `HTTP/1.1 200 OK`
    pub status_line: String,

    /// Response headers in the order received
    pub headers: Vec<(String, String)>,

    /// Raw response body
    pub body: Vec<u8>,
}

impl FetchedResponse {
    /// Returns whether the status is 2xx
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Returns whether the status is 3xx
    pub fn is_redirect(&self) -> bool {
        (300..400).contains(&self.status)
    }

    /// Returns the `Location` header of a redirect response
    pub fn redirect_location(&self) -> Option<&str> {
        if self.is_redirect() {
            self.header("location")
        } else {
            None
        }
    }

    /// Returns the first header with the given name (case-insensitive)
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// Returns whether the content type is HTML or an XML-family markup type
    pub fn is_markup(&self) -> bool {
        self.content_type().is_some_and(|content_type| {
            let content_type = content_type.to_ascii_lowercase();
            MARKUP_CONTENT_TYPES
                .iter()
                .any(|markup| content_type.contains(markup))
        })
    }
}

/// Network-level fetch failure
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Connection failed for {url}: {message}")]
    Connect { url: String, message: String },

    #[error("HTTP error for {url}: {message}")]
    Http { url: String, message: String },
}

/// Fetch capability used for robots.txt and page requests
///
/// `async_trait` keeps the trait object-safe so the orchestrator can hold an
/// `Arc<dyn Transport>`.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetches `url`, giving up after `timeout`
    async fn fetch(&self, url: &Url, timeout: Duration) -> Result<FetchedResponse, FetchError>;
}

/// Builds an HTTP client with proper configuration
///
/// Every request carries the crawler's identifying `User-Agent`. Redirects
/// are not followed: a 3xx comes back as a response so its target can go
/// through the same robots.txt check as any other URL.
///
/// # Example
///
/// ```no_run
/// use corpus_crawler::config::UserAgentConfig;
/// use corpus_crawler::crawler::build_http_client;
///
/// let config = UserAgentConfig {
///     crawler_name: "corpus-crawler".to_string(),
///     crawler_version: "0.1.0".to_string(),
///     contact_url: "https://example.com/bot".to_string(),
///     contact_email: "bot@example.com".to_string(),
/// };
///
/// let client = build_http_client(&config).unwrap();
/// ```
pub fn build_http_client(config: &UserAgentConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.header_value())
        .redirect(redirect::Policy::none())
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// [`Transport`] over a shared reqwest client
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(config: &UserAgentConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(config)?,
        })
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    async fn fetch_inner(&self, url: &Url) -> Result<FetchedResponse, reqwest::Error> {
        let response = self.client.get(url.clone()).send().await?;

        let status = response.status();
        let status_line = format!("{:?} {}", response.version(), status);
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response.bytes().await?.to_vec();

        Ok(FetchedResponse {
            status: status.as_u16(),
            status_line,
            headers,
            body,
        })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    /// The timeout bounds the whole exchange, body download included
    async fn fetch(&self, url: &Url, timeout: Duration) -> Result<FetchedResponse, FetchError> {
        match tokio::time::timeout(timeout, self.fetch_inner(url)).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(e)) => Err(classify_error(url, &e)),
            Err(_) => Err(FetchError::Timeout {
                url: url.to_string(),
            }),
        }
    }
}

fn classify_error(url: &Url, error: &reqwest::Error) -> FetchError {
    let url = url.to_string();
    if error.is_timeout() {
        FetchError::Timeout { url }
    } else if error.is_connect() {
        FetchError::Connect {
            url,
            message: error.to_string(),
        }
    } else {
        FetchError::Http {
            url,
            message: error.to_string(),
        }
    }
}
