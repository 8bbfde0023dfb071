use crate::{UrlError, UrlResult};
use url::{ParseError, Url};

/// Schemes that never lead to a crawlable page
const SKIPPED_SCHEMES: &[&str] = &["javascript:", "mailto:", "tel:", "data:"];

/// Normalizes a URL string into the absolute form used by the frontier
///
/// # Normalization Steps
///
/// 1. Parse the URL; a scheme-less value such as `example.com/page` is
///    treated as `https://example.com/page`
/// 2. Reject anything but HTTP and HTTPS
/// 3. Require a host
/// 4. Remove the fragment (everything after #)
///
/// Host lowercasing and dot-segment removal are performed by the parser.
///
/// # Examples
///
/// ```
/// use corpus_crawler::url::normalize_url;
///
/// let url = normalize_url("http://EXAMPLE.COM/a/../page#top").unwrap();
/// assert_eq!(url.as_str(), "http://example.com/page");
/// ```
pub fn normalize_url(url_str: &str) -> UrlResult<Url> {
    let trimmed = url_str.trim();

    let mut url = match Url::parse(trimmed) {
        Ok(url) => url,
        Err(ParseError::RelativeUrlWithoutBase) => Url::parse(&format!("https://{}", trimmed))
            .map_err(|e| UrlError::Parse(e.to_string()))?,
        Err(e) => return Err(UrlError::Parse(e.to_string())),
    };

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::MissingDomain);
    }

    url.set_fragment(None);

    Ok(url)
}

/// Resolves an href found on `page` into an absolute, normalized URL
///
/// Relative paths, root-relative paths and fragment references are resolved
/// against the page that contained them. Returns `None` for links that can
/// never be crawled:
/// - empty hrefs
/// - javascript:, mailto:, tel: schemes and data: URIs
/// - hrefs that fail to resolve
/// - non-HTTP(S) URLs after resolution
pub fn resolve_link(href: &str, page: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() {
        return None;
    }

    let lowered = href.to_ascii_lowercase();
    if SKIPPED_SCHEMES
        .iter()
        .any(|scheme| lowered.starts_with(scheme))
    {
        return None;
    }

    let mut absolute = page.join(href).ok()?;
    if absolute.scheme() != "http" && absolute.scheme() != "https" {
        return None;
    }
    absolute.host_str()?;
    absolute.set_fragment(None);

    Some(absolute)
}
