//! Crawl worker
//!
//! A worker repeatedly claims a job from the shared [`JobTable`], fetches it,
//! reports the outcome on the result channel and queues the links it finds.
//! Workers never talk to each other; the table is their only shared state.

use crate::config::CrawlOptions;
use crate::crawler::coordinator::VisitEvent;
use crate::crawler::fetcher::{Fetcher, Response};
use crate::crawler::parser::discover_links;
use crate::state::JobTable;
use crate::url::same_host;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, trace, warn};
use url::Url;

/// Lifecycle of a worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Running,
    /// Shutdown observed or the result channel closed; finishing up
    Stopping,
    Stopped,
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WorkerState::Running => "running",
            WorkerState::Stopping => "stopping",
            WorkerState::Stopped => "stopped",
        };
        write!(f, "{}", s)
    }
}

/// What one worker did during the crawl
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerReport {
    pub id: usize,
    /// Successful fetches
    pub pages_fetched: usize,
    /// Failed fetches
    pub failures: usize,
    /// Stopped by shutdown or a closed result channel rather than exhaustion
    pub interrupted: bool,
    pub state: WorkerState,
}

pub(crate) struct Worker {
    id: usize,
    jobs: Arc<JobTable>,
    fetcher: Arc<dyn Fetcher>,
    options: Arc<CrawlOptions>,
    events: mpsc::UnboundedSender<VisitEvent>,
    shutdown: watch::Receiver<bool>,
    state: WorkerState,
}

impl Worker {
    pub(crate) fn new(
        id: usize,
        jobs: Arc<JobTable>,
        fetcher: Arc<dyn Fetcher>,
        options: Arc<CrawlOptions>,
        events: mpsc::UnboundedSender<VisitEvent>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            id,
            jobs,
            fetcher,
            options,
            events,
            shutdown,
            state: WorkerState::Running,
        }
    }

    /// Runs until the table is exhausted, shutdown is raised or the result
    /// channel is closed
    ///
    /// Dropping the worker at the end drops its event sender; once every
    /// worker is gone the coordinator's receiver sees the channel close.
    pub(crate) async fn run(mut self) -> WorkerReport {
        let mut report = WorkerReport {
            id: self.id,
            pages_fetched: 0,
            failures: 0,
            interrupted: false,
            state: self.state,
        };
        trace!("Worker {} started", self.id);

        loop {
            if *self.shutdown.borrow() {
                self.transition(WorkerState::Stopping);
                break;
            }

            let (url, depth) = tokio::select! {
                biased;
                _ = shutdown_requested(&mut self.shutdown) => {
                    self.transition(WorkerState::Stopping);
                    break;
                }
                job = self.jobs.next_job() => match job {
                    Some(job) => job,
                    None => break,
                },
            };

            debug!("Worker {} fetching {} (depth {})", self.id, url, depth);

            let result = tokio::select! {
                biased;
                _ = shutdown_requested(&mut self.shutdown) => {
                    debug!("Worker {} abandoning {}", self.id, url);
                    self.transition(WorkerState::Stopping);
                    break;
                }
                result = self.fetcher.fetch(&url, &self.options.user_agent) => result,
            };

            match &result {
                Ok(_) => report.pages_fetched += 1,
                Err(e) => {
                    debug!("Fetch of {} failed: {}", url, e);
                    report.failures += 1;
                }
            }

            let (redirect_target, links) = match &result {
                Ok(response) => self.follow_up(&url, response),
                Err(_) => (None, Vec::new()),
            };

            let event = VisitEvent {
                requested_url: url.clone(),
                result,
                depth,
            };
            if self.events.send(event).is_err() {
                trace!("Worker {}: result channel closed", self.id);
                self.transition(WorkerState::Stopping);
                break;
            }

            if let Some(target) = redirect_target {
                self.jobs.record_visited(target, depth);
            }
            for link in links {
                self.jobs.discover(link, depth + 1);
            }
            self.jobs.mark_done(&url);

            if !self.options.delay.is_zero() {
                tokio::select! {
                    biased;
                    _ = shutdown_requested(&mut self.shutdown) => {
                        self.transition(WorkerState::Stopping);
                        break;
                    }
                    _ = tokio::time::sleep(self.options.delay) => {}
                }
            }
        }

        report.interrupted = self.state == WorkerState::Stopping;
        self.transition(WorkerState::Stopped);
        report.state = self.state;
        report
    }

    /// Decides what a successful fetch adds to the table
    ///
    /// Returns the redirect target to record as visited (if any) and the
    /// accepted links to queue one level deeper. A redirect off the
    /// requested host yields neither.
    fn follow_up(&self, requested: &str, response: &Response) -> (Option<String>, Vec<String>) {
        let resolved = &response.resolved_url;

        match Url::parse(requested) {
            Ok(requested_url) if same_host(&requested_url, resolved) => {}
            Ok(_) => {
                debug!("{} redirected off-host to {}, not following", requested, resolved);
                return (None, Vec::new());
            }
            Err(e) => {
                warn!("Job key {} is not a valid URL: {}", requested, e);
                return (None, Vec::new());
            }
        }

        let redirect_target = (resolved.as_str() != requested).then(|| resolved.to_string());

        let links = if response.is_html() {
            discover_links(resolved, &response.body)
                .into_iter()
                .filter(|link| self.options.should_visit(link))
                .map(String::from)
                .collect()
        } else {
            Vec::new()
        };

        (redirect_target, links)
    }

    fn transition(&mut self, next: WorkerState) {
        trace!("Worker {}: {} -> {}", self.id, self.state, next);
        self.state = next;
    }
}

/// Resolves once shutdown has been raised
///
/// If the sender is gone without raising the flag, shutdown can no longer
/// happen and this never resolves.
pub(crate) async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    if shutdown.wait_for(|raised| *raised).await.is_err() {
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::{FetchError, FetchResult};
    use crate::state::JobState;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::collections::{BTreeMap, HashMap};
    use std::time::{Duration, Instant};

    struct MapFetcher {
        pages: HashMap<String, (String, String)>,
    }

    impl MapFetcher {
        fn new(pages: &[(&str, &str, &str)]) -> Self {
            Self {
                pages: pages
                    .iter()
                    .map(|(url, resolved, body)| {
                        (url.to_string(), (resolved.to_string(), body.to_string()))
                    })
                    .collect(),
            }
        }
    }

    #[async_trait]
    impl Fetcher for MapFetcher {
        async fn fetch(&self, url: &str, _user_agent: &str) -> FetchResult {
            let (resolved, body) = self
                .pages
                .get(url)
                .ok_or(FetchError::HttpStatus(404))?;
            Ok(Response {
                resolved_url: Url::parse(resolved).unwrap(),
                status: 200,
                headers: BTreeMap::new(),
                content_type: Some("text/html".to_string()),
                charset: None,
                content_encoding: None,
                last_modified: None,
                body: body.clone(),
                fetched_at: Utc::now(),
            })
        }
    }

    fn spawn_worker(
        fetcher: MapFetcher,
        jobs: Arc<JobTable>,
        delay: Duration,
    ) -> (
        Worker,
        mpsc::UnboundedReceiver<VisitEvent>,
        watch::Sender<bool>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let options = CrawlOptions::default().with_delay(delay);
        let worker = Worker::new(
            0,
            jobs,
            Arc::new(fetcher),
            Arc::new(options),
            tx,
            shutdown_rx,
        );
        (worker, rx, shutdown_tx)
    }

    #[tokio::test]
    async fn test_worker_drains_table() {
        let jobs = Arc::new(JobTable::new());
        jobs.try_seed(["http://a.test/"]);
        let fetcher = MapFetcher::new(&[
            ("http://a.test/", "http://a.test/", r#"<a href="/x">x</a><a href="/missing">m</a>"#),
            ("http://a.test/x", "http://a.test/x", r#"<a href="/">home</a>"#),
        ]);

        let (worker, mut rx, _shutdown) = spawn_worker(fetcher, jobs.clone(), Duration::ZERO);
        let report = worker.run().await;

        assert_eq!(report.pages_fetched, 2);
        assert_eq!(report.failures, 1);
        assert_eq!(report.state, WorkerState::Stopped);
        assert!(!report.interrupted);

        let mut visited = Vec::new();
        while let Some(event) = rx.recv().await {
            visited.push((event.requested_url, event.depth, event.result.is_ok()));
        }
        assert_eq!(
            visited,
            vec![
                ("http://a.test/".to_string(), 0, true),
                ("http://a.test/x".to_string(), 1, true),
                ("http://a.test/missing".to_string(), 1, false),
            ]
        );
        assert_eq!(jobs.counts().done, 3);
    }

    #[tokio::test]
    async fn test_worker_records_redirect_target() {
        let jobs = Arc::new(JobTable::new());
        jobs.try_seed(["http://a.test/old"]);
        let fetcher = MapFetcher::new(&[(
            "http://a.test/old",
            "http://a.test/new",
            r#"<a href="/new">self</a>"#,
        )]);

        let (worker, mut rx, _shutdown) = spawn_worker(fetcher, jobs.clone(), Duration::ZERO);
        let report = worker.run().await;

        assert_eq!(report.pages_fetched, 1);
        let event = rx.recv().await.unwrap();
        assert_eq!(event.requested_url, "http://a.test/old");
        assert!(rx.recv().await.is_none());

        let target = jobs.get("http://a.test/new").unwrap();
        assert_eq!(target.depth, 0);
        assert!(target.state.is_terminal());
    }

    #[tokio::test]
    async fn test_worker_ignores_links_after_off_host_redirect() {
        let jobs = Arc::new(JobTable::new());
        jobs.try_seed(["http://a.test/"]);
        let fetcher = MapFetcher::new(&[(
            "http://a.test/",
            "http://b.test/landing",
            r#"<a href="/elsewhere">x</a>"#,
        )]);

        let (worker, mut rx, _shutdown) = spawn_worker(fetcher, jobs.clone(), Duration::ZERO);
        worker.run().await;

        let event = rx.recv().await.unwrap();
        assert_eq!(event.requested_url, "http://a.test/");
        assert_eq!(event.url(), "http://b.test/landing");
        assert!(rx.recv().await.is_none());

        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs.get("http://a.test/").unwrap().state, JobState::Done);
        assert!(jobs.get("http://b.test/landing").is_none());
    }

    #[tokio::test]
    async fn test_worker_paces_after_every_fetch() {
        let jobs = Arc::new(JobTable::new());
        jobs.try_seed(["http://a.test/"]);
        let fetcher = MapFetcher::new(&[
            ("http://a.test/", "http://a.test/", r#"<a href="/missing">m</a><a href="/x">x</a>"#),
            ("http://a.test/x", "http://a.test/x", ""),
        ]);

        let (worker, mut rx, _shutdown) =
            spawn_worker(fetcher, jobs.clone(), Duration::from_millis(100));
        let started = Instant::now();
        let report = worker.run().await;
        let elapsed = started.elapsed();

        // The failed fetch of /missing sits between the two successful ones
        assert_eq!(report.pages_fetched, 2);
        assert_eq!(report.failures, 1);
        assert!(elapsed >= Duration::from_millis(300), "elapsed {:?}", elapsed);

        let mut order = Vec::new();
        while let Some(event) = rx.recv().await {
            order.push(event.requested_url);
        }
        assert_eq!(
            order,
            vec!["http://a.test/", "http://a.test/missing", "http://a.test/x"]
        );
    }

    #[tokio::test]
    async fn test_worker_stops_on_shutdown() {
        let jobs = Arc::new(JobTable::new());
        jobs.try_seed(["http://a.test/"]);
        let fetcher = MapFetcher::new(&[("http://a.test/", "http://a.test/", "")]);

        let (worker, mut rx, shutdown) = spawn_worker(fetcher, jobs.clone(), Duration::ZERO);
        shutdown.send_replace(true);
        let report = worker.run().await;

        assert_eq!(report.pages_fetched, 0);
        assert_eq!(report.state, WorkerState::Stopped);
        assert!(report.interrupted);
        assert!(rx.recv().await.is_none());
        assert_eq!(jobs.counts().waiting, 1);
    }

    #[tokio::test]
    async fn test_worker_stops_when_channel_closed() {
        let jobs = Arc::new(JobTable::new());
        jobs.try_seed(["http://a.test/", "http://a.test/2"]);
        let fetcher = MapFetcher::new(&[
            ("http://a.test/", "http://a.test/", ""),
            ("http://a.test/2", "http://a.test/2", ""),
        ]);

        let (worker, rx, _shutdown) = spawn_worker(fetcher, jobs.clone(), Duration::ZERO);
        drop(rx);
        let report = worker.run().await;

        assert_eq!(report.pages_fetched, 1);
        assert!(report.interrupted);
        assert_eq!(jobs.counts().waiting, 1);
    }
}
