//! URL handling module for Ripple-Crawl
//!
//! This module provides link normalization, host extraction, host pattern
//! matching, and the visit predicates that decide which discovered links are
//! queued.

mod domain;
mod matcher;
mod normalize;

use ::url::Url;

// Re-export main functions
pub use domain::{extract_host, same_host};
pub use matcher::matches_host_pattern;
pub use normalize::{normalize_link, parse_seed};

/// Decides whether a discovered link should be queued for crawling
///
/// The predicate is consulted once per normalized link found on an in-scope
/// page. Any `Fn(&Url) -> bool` closure that is `Send + Sync` is a predicate.
///
/// # Examples
///
/// ```
/// use ripple_crawl::url::VisitPredicate;
/// use url::Url;
///
/// let no_pdfs = |url: &Url| !url.path().ends_with(".pdf");
/// assert!(no_pdfs.should_visit(&Url::parse("http://a.test/page").unwrap()));
/// assert!(!no_pdfs.should_visit(&Url::parse("http://a.test/doc.pdf").unwrap()));
/// ```
pub trait VisitPredicate: Send + Sync {
    fn should_visit(&self, url: &Url) -> bool;
}

impl<F> VisitPredicate for F
where
    F: Fn(&Url) -> bool + Send + Sync,
{
    fn should_visit(&self, url: &Url) -> bool {
        self(url)
    }
}

/// A visit predicate that accepts links whose host matches a set of patterns
///
/// Patterns use [`matches_host_pattern`] syntax. A scope built with
/// [`HostScope::from_seeds`] keeps the crawl on the hosts it started from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostScope {
    patterns: Vec<String>,
}

impl HostScope {
    /// Creates an empty scope (accepts nothing until patterns are added)
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a scope containing the exact host of every seed
    pub fn from_seeds<'a>(seeds: impl IntoIterator<Item = &'a Url>) -> Self {
        let mut scope = Self::new();
        for host in seeds.into_iter().filter_map(extract_host) {
            scope.push(host);
        }
        scope
    }

    /// Adds a host pattern (e.g. `"b.test"` or `"*.b.test"`)
    pub fn allow(mut self, pattern: impl Into<String>) -> Self {
        self.push(pattern.into());
        self
    }

    /// Returns the patterns in this scope
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// Returns true if the host matches any pattern in the scope
    pub fn contains_host(&self, host: &str) -> bool {
        self.patterns
            .iter()
            .any(|pattern| matches_host_pattern(pattern, host))
    }

    fn push(&mut self, pattern: String) {
        let pattern = pattern.to_ascii_lowercase();
        if !self.patterns.contains(&pattern) {
            self.patterns.push(pattern);
        }
    }
}

impl VisitPredicate for HostScope {
    fn should_visit(&self, url: &Url) -> bool {
        url.host_str()
            .map(|host| self.contains_host(host))
            .unwrap_or(false)
    }
}
