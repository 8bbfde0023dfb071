//! HTML link extraction
//!
//! Links are returned exactly as written in the markup; resolving them
//! against the page URL is done by [`crate::url::resolve_link`].

use scraper::{Html, Selector};

/// Pulls outbound link targets out of a page
pub trait LinkExtractor: Send + Sync {
    /// Returns the raw `href` values of every followable link in `html`
    fn extract_links(&self, html: &str) -> Vec<String>;
}

/// [`LinkExtractor`] backed by an HTML5 parser
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` anywhere in the document
/// - `<link rel="canonical" href="...">`
///
/// **Exclude:**
/// - `<a href="..." download>`
/// - stylesheets, scripts, images and other embedded resources
///
/// `rel="nofollow"` links are still returned.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlLinkExtractor;

impl LinkExtractor for HtmlLinkExtractor {
    fn extract_links(&self, html: &str) -> Vec<String> {
        let document = Html::parse_document(html);
        let mut links = Vec::new();

        if let Ok(a_selector) = Selector::parse("a[href]") {
            for element in document.select(&a_selector) {
                if element.value().attr("download").is_some() {
                    continue;
                }
                if let Some(href) = element.value().attr("href") {
                    links.push(href.to_string());
                }
            }
        }

        if let Ok(canonical_selector) = Selector::parse("link[rel='canonical'][href]") {
            links.extend(
                document
                    .select(&canonical_selector)
                    .filter_map(|element| element.value().attr("href"))
                    .map(str::to_string),
            );
        }

        links
    }
}
