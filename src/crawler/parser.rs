//! HTML link extraction
//!
//! Only `<a href="...">` anchors are followed. Stylesheets, scripts, images
//! and canonical links are page resources, not navigation.

use crate::url::normalize_link;
use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

/// Returns the raw `href` value of every anchor, in document order
///
/// Values are trimmed; empty ones are dropped. Nothing is resolved or
/// filtered here, see [`discover_links`] for that.
///
/// # Example
///
/// ```
/// use ripple_crawl::crawler::extract_hrefs;
///
/// let html = r#"<p><a href="/a">A</a> <a name="x">no href</a> <a href=" b ">B</a></p>"#;
/// assert_eq!(extract_hrefs(html), vec!["/a", "b"]);
/// ```
pub fn extract_hrefs(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    document
        .select(&selector)
        .filter_map(|element| element.value().attr("href"))
        .map(str::trim)
        .filter(|href| !href.is_empty())
        .map(str::to_string)
        .collect()
}

/// Extracts every crawlable link of a page, resolved against `base`
///
/// Links are normalized with [`normalize_link`]; duplicates are removed
/// while keeping first-occurrence order so discovery stays deterministic.
pub fn discover_links(base: &Url, html: &str) -> Vec<Url> {
    let mut seen = HashSet::new();
    extract_hrefs(html)
        .iter()
        .filter_map(|href| normalize_link(base, href))
        .filter(|url| seen.insert(url.as_str().to_string()))
        .collect()
}
