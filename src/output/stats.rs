//! Statistics collected from visit events
//!
//! This module provides functionality for tallying crawl results while the
//! crawl runs and displaying them once it is over.

use crate::crawler::{FetchError, VisitEvent};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write;

/// Crawl statistics summary
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisitStatistics {
    /// Number of events seen
    pub total_pages: u64,

    /// Successful fetches
    pub succeeded: u64,

    /// Count of events by depth
    pub pages_by_depth: BTreeMap<u32, u64>,

    /// Failed fetches by error kind
    pub error_summary: BTreeMap<String, u64>,

    /// Hosts of every requested URL
    pub hosts: BTreeSet<String>,
}

impl VisitStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tallies one visit event
    pub fn record(&mut self, event: &VisitEvent) {
        self.total_pages += 1;
        *self.pages_by_depth.entry(event.depth).or_insert(0) += 1;

        match &event.result {
            Ok(_) => self.succeeded += 1,
            Err(e) => *self.error_summary.entry(error_kind(e)).or_insert(0) += 1,
        }

        if let Some(host) = url::Url::parse(&event.requested_url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_ascii_lowercase))
        {
            self.hosts.insert(host);
        }
    }

    pub fn failed(&self) -> u64 {
        self.total_pages - self.succeeded
    }

    /// Percentage of successful fetches (0 when nothing was fetched)
    pub fn success_rate(&self) -> f64 {
        if self.total_pages > 0 {
            (self.succeeded as f64 / self.total_pages as f64) * 100.0
        } else {
            0.0
        }
    }
}

fn error_kind(error: &FetchError) -> String {
    match error {
        FetchError::Timeout(_) => "timeout".to_string(),
        FetchError::Connect(_) => "connect".to_string(),
        FetchError::HttpStatus(code) => format!("http {}", code),
        FetchError::Redirect(_) => "redirect".to_string(),
        FetchError::Body(_) => "body".to_string(),
        FetchError::InvalidUrl(_) => "invalid url".to_string(),
        FetchError::Other(_) => "other".to_string(),
    }
}

/// Formats statistics as a human-readable report
pub fn format_statistics(stats: &VisitStatistics) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "=== Crawl Statistics ===\n");

    let _ = writeln!(out, "Overview:");
    let _ = writeln!(out, "  Pages visited: {}", stats.total_pages);
    let _ = writeln!(out, "  Unique hosts: {}", stats.hosts.len());
    let _ = writeln!(out);

    if !stats.pages_by_depth.is_empty() {
        let _ = writeln!(out, "Pages by Depth:");
        for (depth, count) in &stats.pages_by_depth {
            let _ = writeln!(out, "  {:02}: {}", depth, count);
        }
        let _ = writeln!(out);
    }

    if !stats.error_summary.is_empty() {
        let _ = writeln!(out, "Error Summary:");
        // Sort errors by count (descending)
        let mut error_counts: Vec<_> = stats.error_summary.iter().collect();
        error_counts.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));

        for (kind, count) in error_counts {
            let _ = writeln!(out, "  {}: {}", kind, count);
        }
        let _ = writeln!(out);
    }

    let _ = writeln!(
        out,
        "Success Rate: {:.1}% ({} / {} pages successfully fetched)",
        stats.success_rate(),
        stats.succeeded,
        stats.total_pages
    );

    out
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &VisitStatistics) {
    print!("{}", format_statistics(stats));
}
