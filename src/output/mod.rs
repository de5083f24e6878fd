//! Output module for reporting crawl progress and results
//!
//! This module handles:
//! - Printing one line per visited page while the crawl runs
//! - Recording crawl statistics
//! - Printing the final summary

mod console;
pub mod stats;

pub use console::{truncate_url, ConsoleReporter, DEFAULT_WIDTH};
pub use stats::{format_statistics, print_statistics, VisitStatistics};

use crate::crawler::CrawlSummary;

/// Formats the closing summary of a crawl
///
/// # Example
///
/// ```
/// # use ripple_crawl::output::format_summary;
/// # use ripple_crawl::CrawlSummary;
/// # use chrono::Utc;
/// let started_at = Utc::now();
/// let summary = CrawlSummary {
///     pages_visited: 12,
///     failures: 1,
///     jobs_discovered: 40,
///     aborted: false,
///     started_at,
///     finished_at: started_at + chrono::Duration::seconds(3723),
///     workers: Vec::new(),
/// };
/// assert!(format_summary(&summary).contains("Running Time: 01:02:03"));
/// ```
pub fn format_summary(summary: &CrawlSummary) -> String {
    let status = if summary.aborted {
        "Crawl aborted"
    } else {
        "Crawl complete"
    };

    format!(
        " {}\n Number of Pages Crawled: {}\n Failed Fetches: {}\n URLs Discovered: {}\n Running Time: {}\n",
        status,
        summary.pages_visited,
        summary.failures,
        summary.jobs_discovered,
        format_duration(summary.duration())
    )
}

/// Prints the closing summary to stderr
pub fn print_summary(summary: &CrawlSummary) {
    eprintln!();
    eprint!("{}", format_summary(summary));
}

/// Formats a duration as `HH:MM:SS`
fn format_duration(duration: chrono::Duration) -> String {
    let secs = duration.num_seconds().max(0);
    format!(
        "{:02}:{:02}:{:02}",
        secs / 3600,
        (secs % 3600) / 60,
        secs % 60
    )
}
