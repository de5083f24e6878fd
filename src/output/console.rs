//! Live crawl progress on the terminal

use crate::crawler::{CrawlControl, VisitEvent, VisitHandler};
use crate::output::stats::VisitStatistics;
use std::io::{self, Stderr, Write};
use tracing::warn;

/// Column width URLs are truncated to
pub const DEFAULT_WIDTH: usize = 70;

/// [`VisitHandler`] that prints one line per visited page
///
/// Each line holds the two-digit depth followed by the requested URL,
/// shortened with `...` to fit the configured width. Failed fetches get the
/// error appended.
pub struct ConsoleReporter<W: Write = Stderr> {
    out: W,
    width: usize,
    stats: VisitStatistics,
}

impl ConsoleReporter<Stderr> {
    /// Reports to standard error
    pub fn stderr() -> Self {
        Self::new(io::stderr())
    }
}

impl<W: Write> ConsoleReporter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            width: DEFAULT_WIDTH,
            stats: VisitStatistics::new(),
        }
    }

    pub fn with_width(mut self, width: usize) -> Self {
        self.width = width;
        self
    }

    pub fn statistics(&self) -> &VisitStatistics {
        &self.stats
    }

    pub fn into_parts(self) -> (W, VisitStatistics) {
        (self.out, self.stats)
    }

    fn write_event(&mut self, event: &VisitEvent) -> io::Result<()> {
        let url = truncate_url(&event.requested_url, self.width);
        match &event.result {
            Ok(_) => writeln!(self.out, "    {:02}    {}", event.depth, url)?,
            Err(e) => writeln!(self.out, "    {:02}    {}  [{}]", event.depth, url, e)?,
        }
        self.out.flush()
    }
}

impl<W: Write> VisitHandler for ConsoleReporter<W> {
    fn on_visit(&mut self, event: &VisitEvent) -> CrawlControl {
        self.stats.record(event);
        if let Err(e) = self.write_event(event) {
            warn!("Failed to write progress line: {}", e);
        }
        CrawlControl::Continue
    }
}

/// Shortens `url` to fit `width` columns
///
/// URLs longer than `width - 2` characters keep their first `width - 5`
/// characters followed by `...`.
pub fn truncate_url(url: &str, width: usize) -> String {
    let len = url.chars().count();
    if len + 2 > width {
        let keep = width.saturating_sub(5);
        let mut short: String = url.chars().take(keep).collect();
        short.push_str("...");
        short
    } else {
        url.to_string()
    }
}
