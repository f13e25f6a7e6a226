//! HTML parser for extracting document links
//!
//! This module handles parsing listing pages to extract:
//! - Links matching a source's CSS selector
//! - The "next page" link when a listing is paginated

use crate::extract::ExtractError;
use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

/// Extracted information from a listing page
#[derive(Debug, Clone, Default)]
pub struct ParsedListing {
    /// Document links matched by the selector (absolute URLs, deduplicated)
    pub links: Vec<String>,

    /// Next listing page, if the page advertises one
    pub next_page: Option<Url>,
}

/// Parses a listing page and extracts links matched by `selector`
///
/// # Link Extraction Rules
///
/// - Only elements matched by `selector` are considered
/// - The link is taken from `href`, falling back to `src` and `data-href`
/// - `javascript:`, `mailto:`, `tel:`, `data:` and fragment-only links are dropped
/// - Relative links are resolved against `base_url`
/// - Only HTTP(S) results are kept; duplicates are removed, first one wins
///
/// # Example
///
/// ```
/// use doc_harvest::extract::parse_listing;
/// use url::Url;
///
/// let html = r#"<html><body><a href="/docs/ley.pdf">Ley</a></body></html>"#;
/// let base_url = Url::parse("https://example.com/laws").unwrap();
/// let parsed = parse_listing(html, &base_url, "a[href$='.pdf']").unwrap();
/// assert_eq!(parsed.links, vec!["https://example.com/docs/ley.pdf".to_string()]);
/// ```
pub fn parse_listing(
    html: &str,
    base_url: &Url,
    selector: &str,
) -> Result<ParsedListing, ExtractError> {
    let link_selector = Selector::parse(selector).map_err(|e| ExtractError::Selector {
        selector: selector.to_string(),
        message: format!("{:?}", e),
    })?;

    let document = Html::parse_document(html);

    let mut seen = HashSet::new();
    let mut links = Vec::new();
    for element in document.select(&link_selector) {
        let attrs = element.value();
        let href = attrs
            .attr("href")
            .or_else(|| attrs.attr("src"))
            .or_else(|| attrs.attr("data-href"));

        if let Some(absolute_url) = href.and_then(|h| resolve_link(h, base_url)) {
            if seen.insert(absolute_url.clone()) {
                links.push(absolute_url);
            }
        }
    }

    let next_page = find_next_page(&document, base_url);

    Ok(ParsedListing { links, next_page })
}

/// Finds the `rel="next"` link of a paginated listing
fn find_next_page(document: &Html, base_url: &Url) -> Option<Url> {
    let next_selector = Selector::parse("a[rel~='next'][href], link[rel~='next'][href]").ok()?;

    document
        .select(&next_selector)
        .filter_map(|element| element.value().attr("href"))
        .filter_map(|href| resolve_link(href, base_url))
        .find_map(|href| Url::parse(&href).ok())
}

/// Resolves a link href to an absolute URL and validates it
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - Fragment-only anchors
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if lower.starts_with("javascript:")
        || lower.starts_with("mailto:")
        || lower.starts_with("tel:")
        || lower.starts_with("data:")
    {
        return None;
    }

    if href.starts_with('#') {
        return None;
    }

    match base_url.join(href) {
        Ok(mut absolute_url) => {
            if absolute_url.scheme() == "http" || absolute_url.scheme() == "https" {
                absolute_url.set_fragment(None);
                Some(absolute_url.to_string())
            } else {
                None
            }
        }
        Err(_) => None,
    }
}
