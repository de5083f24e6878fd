//! Crawler coordinator - main crawl orchestration logic
//!
//! The coordinator owns one crawl from start to finish:
//! - validating the options and seeding the job table
//! - spawning the worker pool
//! - draining the result channel into the caller's [`VisitHandler`]
//! - shutting the pool down on exhaustion, handler abort or an external
//!   [`ShutdownHandle`]
//!
//! Handler callbacks all run on the task that awaits [`Coordinator::run`],
//! one at a time and in the order the events were produced.

use crate::config::{parse_seeds, validate_options, CrawlOptions};
use crate::crawler::fetcher::{FetchResult, Fetcher, HttpFetcher, Response};
use crate::crawler::worker::{shutdown_requested, Worker, WorkerReport};
use crate::state::JobTable;
use crate::CrawlError;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, info, warn};

/// Outcome of one fetch, delivered to the handler
#[derive(Debug)]
pub struct VisitEvent {
    /// The job key that was fetched, before any redirect
    pub requested_url: String,

    /// The fetched page, or why the fetch failed
    pub result: FetchResult,

    /// Breadth-first distance from the nearest seed
    pub depth: u32,
}

impl VisitEvent {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    pub fn response(&self) -> Option<&Response> {
        self.result.as_ref().ok()
    }

    /// URL the page was finally served from, falling back to the request
    pub fn url(&self) -> &str {
        self.response()
            .map(|r| r.resolved_url.as_str())
            .unwrap_or(&self.requested_url)
    }
}

/// What the crawl should do after a handler callback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CrawlControl {
    #[default]
    Continue,
    /// Stop the crawl; events still buffered are discarded
    Abort,
}

/// Receives every visit event of a crawl
///
/// Any `FnMut(&VisitEvent) -> CrawlControl` closure is a handler.
pub trait VisitHandler {
    fn on_visit(&mut self, event: &VisitEvent) -> CrawlControl;
}

impl<F> VisitHandler for F
where
    F: FnMut(&VisitEvent) -> CrawlControl,
{
    fn on_visit(&mut self, event: &VisitEvent) -> CrawlControl {
        self(event)
    }
}

/// Totals of a finished crawl
#[derive(Debug, Clone)]
pub struct CrawlSummary {
    /// Events delivered to the handler
    pub pages_visited: usize,

    /// Delivered events whose fetch failed
    pub failures: usize,

    /// Distinct URLs known to the job table at the end
    pub jobs_discovered: usize,

    /// Whether the crawl was stopped before the table was exhausted
    pub aborted: bool,

    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,

    /// One report per worker, ordered by worker id
    pub workers: Vec<WorkerReport>,
}

impl CrawlSummary {
    /// Wall-clock running time of the crawl
    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

/// Stops a running crawl from outside the handler
///
/// Cloneable and usable from any task, e.g. a Ctrl+C listener. The shutdown
/// flag is never lowered once raised.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    flag: Arc<watch::Sender<bool>>,
}

impl ShutdownHandle {
    pub fn abort(&self) {
        if !self.flag.send_replace(true) {
            info!("Shutdown requested");
        }
    }

    pub fn is_aborted(&self) -> bool {
        *self.flag.borrow()
    }
}

/// Main crawler coordinator structure
pub struct Coordinator {
    jobs: Arc<JobTable>,
    fetcher: Arc<dyn Fetcher>,
    options: Arc<CrawlOptions>,
    shutdown: ShutdownHandle,
}

impl Coordinator {
    /// Creates a coordinator with a seeded job table
    ///
    /// Fails before anything is fetched if the options are invalid, the
    /// seed list is empty or a seed is not an absolute http(s) URL.
    pub fn new<S: AsRef<str>>(
        seeds: &[S],
        options: CrawlOptions,
        fetcher: Arc<dyn Fetcher>,
    ) -> Result<Self, CrawlError> {
        validate_options(&options)?;
        let seeds = parse_seeds(seeds)?;

        let jobs = JobTable::new();
        let seeded = jobs.try_seed(seeds.iter().map(|url| url.to_string()));
        debug!("Seeded {} job(s)", seeded);

        let (flag, _) = watch::channel(false);

        Ok(Self {
            jobs: Arc::new(jobs),
            fetcher,
            options: Arc::new(options),
            shutdown: ShutdownHandle {
                flag: Arc::new(flag),
            },
        })
    }

    /// Returns a handle that aborts this crawl when triggered
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// The job table driving this crawl
    pub fn jobs(&self) -> &Arc<JobTable> {
        &self.jobs
    }

    /// Runs the crawl to completion
    ///
    /// Returns once the job table is exhausted and every event has been
    /// handled, or once the crawl was aborted and every worker has stopped.
    /// A panic in the handler or in a worker propagates to the caller.
    pub async fn run<H: VisitHandler>(self, mut handler: H) -> Result<CrawlSummary, CrawlError> {
        let started_at = Utc::now();
        let start_time = Instant::now();
        info!(
            "Starting crawl with {} worker(s), {} seed(s)",
            self.options.workers,
            self.jobs.len()
        );

        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut workers = JoinSet::new();
        for id in 0..self.options.workers {
            let worker = Worker::new(
                id,
                Arc::clone(&self.jobs),
                Arc::clone(&self.fetcher),
                Arc::clone(&self.options),
                tx.clone(),
                self.shutdown.flag.subscribe(),
            );
            workers.spawn(worker.run());
        }
        // Workers hold the only senders, so the channel closes when they stop
        drop(tx);

        let mut shutdown = self.shutdown.flag.subscribe();
        let mut reports = Vec::with_capacity(self.options.workers);
        let mut pages_visited = 0;
        let mut failures = 0;
        let mut aborted = false;

        loop {
            let event = tokio::select! {
                biased;
                _ = shutdown_requested(&mut shutdown) => {
                    aborted = true;
                    break;
                }
                event = rx.recv() => match event {
                    Some(event) => event,
                    None => break,
                },
                // A worker that dies early leaves its job in progress, so
                // the others never see exhaustion and the channel stays open
                Some(joined) = workers.join_next() => {
                    self.collect_worker(joined, &mut reports);
                    continue;
                }
            };

            pages_visited += 1;
            if !event.is_success() {
                failures += 1;
            }

            if handler.on_visit(&event) == CrawlControl::Abort {
                info!("Handler aborted the crawl after {} page(s)", pages_visited);
                self.shutdown.abort();
                aborted = true;
                break;
            }

            // Progress reporting every 10 pages
            if pages_visited % 10 == 0 {
                let counts = self.jobs.counts();
                let rate = pages_visited as f64 / start_time.elapsed().as_secs_f64();
                info!(
                    "Progress: {} pages visited, {} waiting, {} in progress, {:.2} pages/sec",
                    pages_visited, counts.waiting, counts.in_progress, rate
                );
            }
        }

        // Discard whatever is still buffered; blocked senders see the close
        drop(rx);

        while let Some(joined) = workers.join_next().await {
            self.collect_worker(joined, &mut reports);
        }
        reports.sort_by_key(|report| report.id);

        let summary = CrawlSummary {
            pages_visited,
            failures,
            jobs_discovered: self.jobs.len(),
            aborted,
            started_at,
            finished_at: Utc::now(),
            workers: reports,
        };

        info!(
            "Crawl {}: {} pages visited ({} failed), {} URLs discovered",
            if aborted { "aborted" } else { "complete" },
            summary.pages_visited,
            summary.failures,
            summary.jobs_discovered
        );

        Ok(summary)
    }
}

impl Coordinator {
    /// Records a finished worker, re-raising its panic after stopping the rest
    fn collect_worker(
        &self,
        joined: Result<WorkerReport, JoinError>,
        reports: &mut Vec<WorkerReport>,
    ) {
        match joined {
            Ok(report) => reports.push(report),
            Err(e) if e.is_panic() => {
                self.shutdown.abort();
                std::panic::resume_unwind(e.into_panic())
            }
            Err(e) => warn!("Worker task ended abnormally: {}", e),
        }
    }
}

/// Crawls from `seeds` with the default HTTP fetcher
///
/// This is the main entry point. Every fetched page, successful or not, is
/// passed to `handler` together with its breadth-first depth.
///
/// # Example
///
/// ```no_run
/// use ripple_crawl::{crawl, CrawlControl, CrawlOptions, VisitEvent};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let summary = crawl(
///     &["https://example.com/"],
///     CrawlOptions::default(),
///     |event: &VisitEvent| {
///         println!("{:>3} {}", event.depth, event.requested_url);
///         CrawlControl::Continue
///     },
/// )
/// .await?;
/// println!("{} pages", summary.pages_visited);
/// # Ok(())
/// # }
/// ```
pub async fn crawl<S, H>(
    seeds: &[S],
    options: CrawlOptions,
    handler: H,
) -> Result<CrawlSummary, CrawlError>
where
    S: AsRef<str>,
    H: VisitHandler,
{
    validate_options(&options)?;
    let fetcher = HttpFetcher::new(&options.fetcher)?;
    Coordinator::new(seeds, options, Arc::new(fetcher))?
        .run(handler)
        .await
}
