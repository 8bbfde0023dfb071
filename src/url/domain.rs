use crate::{UrlError, UrlResult};
use url::Url;

/// Derives the domain key of a URL
///
/// The key is the URL's origin, `scheme://host[:port]`, with the host
/// lowercased and default ports omitted. Only HTTP(S) URLs with a host have a
/// domain key.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use corpus_crawler::url::domain_key;
///
/// let url = Url::parse("https://EXAMPLE.com/path?q=1").unwrap();
/// assert_eq!(domain_key(&url), Some("https://example.com".to_string()));
///
/// let url = Url::parse("http://localhost:8080/").unwrap();
/// assert_eq!(domain_key(&url), Some("http://localhost:8080".to_string()));
/// ```
pub fn domain_key(url: &Url) -> Option<String> {
    if url.scheme() != "http" && url.scheme() != "https" {
        return None;
    }
    url.host_str()?;
    Some(url.origin().ascii_serialization())
}

/// Builds the robots.txt URL for a domain key
pub fn robots_url(domain: &str) -> UrlResult<Url> {
    let base = Url::parse(domain).map_err(|e| UrlError::Parse(e.to_string()))?;
    if base.host_str().is_none() {
        return Err(UrlError::MissingDomain);
    }
    base.join("/robots.txt")
        .map_err(|e| UrlError::Parse(e.to_string()))
}
