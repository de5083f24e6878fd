//! The shared job table
//!
//! Every URL the crawl has ever seen lives here, keyed by its canonical string
//! form. The table doubles as the visited-set and as the ready queue that
//! workers drain. All control decisions (claim, discover, completion) happen
//! under one mutex; idle workers park on a [`Notify`] rather than polling.

use super::JobState;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;

/// One crawl job, created exactly once per distinct URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    /// Canonical absolute URL, the table key
    pub url: String,

    /// Current state; only ever moves forward
    pub state: JobState,

    /// Breadth-first distance from the nearest seed, fixed at first discovery
    pub depth: u32,
}

/// Outcome of a single claim attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Claim {
    /// A waiting job was claimed and is now `InProgress`
    Job { url: String, depth: u32 },

    /// Nothing is waiting, but jobs in progress may still discover more work
    Retry,

    /// Nothing is waiting and nothing is in progress: no work will ever appear
    Exhausted,
}

/// Number of jobs in each state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JobCounts {
    pub waiting: usize,
    pub in_progress: usize,
    pub done: usize,
}

impl JobCounts {
    /// Total number of jobs in the table
    pub fn total(&self) -> usize {
        self.waiting + self.in_progress + self.done
    }
}

#[derive(Debug, Default)]
struct Inner {
    jobs: HashMap<String, Job>,

    /// Waiting URLs in discovery order
    ready: VecDeque<String>,

    in_progress: usize,
}

impl Inner {
    /// Inserts a job if the URL is unknown. Returns true on insert.
    fn insert(&mut self, url: String, depth: u32, state: JobState) -> bool {
        if self.jobs.contains_key(&url) {
            return false;
        }

        if state == JobState::Waiting {
            self.ready.push_back(url.clone());
        }
        self.jobs.insert(url.clone(), Job { url, state, depth });
        true
    }
}

/// Mutex-guarded map from URL to [`Job`]
///
/// Shared between the coordinator and every worker behind an `Arc`. The table
/// grows monotonically for the lifetime of one crawl; jobs are never removed.
#[derive(Debug, Default)]
pub struct JobTable {
    inner: Mutex<Inner>,
    wakeup: Notify,
}

impl JobTable {
    /// Creates an empty job table
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts one `Waiting` job at depth 0 per URL that is not yet known
    ///
    /// Idempotent: seeding the same URL twice leaves a single job.
    ///
    /// # Returns
    ///
    /// The number of jobs actually created
    pub fn try_seed<I, S>(&self, urls: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let inserted = {
            let mut inner = self.lock();
            urls.into_iter()
                .map(|url| inner.insert(url.into(), 0, JobState::Waiting))
                .filter(|inserted| *inserted)
                .count()
        };

        if inserted > 0 {
            self.wakeup.notify_waiters();
        }
        inserted
    }

    /// Inserts a `Waiting` job at `depth` if the URL is not yet known
    ///
    /// The first discovery wins: rediscovering a URL, even via a shorter
    /// path, never changes its depth or state.
    ///
    /// # Returns
    ///
    /// * `true` - A new job was created
    /// * `false` - The URL was already known
    pub fn discover(&self, url: impl Into<String>, depth: u32) -> bool {
        let url = url.into();
        let inserted = self.lock().insert(url.clone(), depth, JobState::Waiting);

        if inserted {
            tracing::trace!("Discovered {} at depth {}", url, depth);
            self.wakeup.notify_waiters();
        }
        inserted
    }

    /// Records a URL as already visited, without queuing it
    ///
    /// Used for redirect targets: the page was fetched under another URL, so
    /// it gets a `Done` job at the same depth and is never fetched again.
    /// Existing jobs are left untouched.
    pub fn record_visited(&self, url: impl Into<String>, depth: u32) -> bool {
        self.lock().insert(url.into(), depth, JobState::Done)
    }

    /// Atomically claims the next waiting job
    ///
    /// Waiting jobs are served in the order they were discovered, so every
    /// job is eventually claimed and a single worker sees them level by level.
    pub fn claim(&self) -> Claim {
        let mut guard = self.lock();
        let inner = &mut *guard;

        while let Some(url) = inner.ready.pop_front() {
            if let Some(job) = inner.jobs.get_mut(&url) {
                if job.state.can_transition_to(JobState::InProgress) {
                    job.state = JobState::InProgress;
                    inner.in_progress += 1;
                    tracing::trace!("Claimed {} at depth {}", url, job.depth);
                    return Claim::Job {
                        url,
                        depth: job.depth,
                    };
                }
            }
        }

        if inner.in_progress > 0 {
            Claim::Retry
        } else {
            Claim::Exhausted
        }
    }

    /// Moves a claimed job to `Done`
    ///
    /// Jobs that are not `InProgress` are left as they are; state never moves
    /// backwards.
    ///
    /// # Returns
    ///
    /// `true` if the job transitioned
    pub fn mark_done(&self, url: &str) -> bool {
        let changed = {
            let mut guard = self.lock();
            let inner = &mut *guard;

            match inner.jobs.get_mut(url) {
                Some(job) if job.state.can_transition_to(JobState::Done) => {
                    job.state = JobState::Done;
                    inner.in_progress -= 1;
                    true
                }
                Some(job) => {
                    tracing::warn!("Ignoring completion of {} in state {}", url, job.state);
                    false
                }
                None => {
                    tracing::warn!("Ignoring completion of unknown job {}", url);
                    false
                }
            }
        };

        // The last completion may turn Retry into Exhausted for parked workers
        if changed {
            self.wakeup.notify_waiters();
        }
        changed
    }

    /// Waits until a job can be claimed or the table is exhausted
    ///
    /// This is the blocking form of [`claim`](Self::claim): instead of
    /// spinning on `Claim::Retry`, the caller parks until a discovery or a
    /// completion changes the picture.
    ///
    /// # Returns
    ///
    /// * `Some((url, depth))` - A job now `InProgress` for the caller
    /// * `None` - No more work will ever appear
    pub async fn next_job(&self) -> Option<(String, u32)> {
        loop {
            // Registered before claiming so a wakeup in between is not lost
            let notified = self.wakeup.notified();

            match self.claim() {
                Claim::Job { url, depth } => return Some((url, depth)),
                Claim::Exhausted => return None,
                Claim::Retry => notified.await,
            }
        }
    }

    /// Returns a copy of the job for `url`, if known
    pub fn get(&self, url: &str) -> Option<Job> {
        self.lock().jobs.get(url).cloned()
    }

    /// Returns the number of distinct URLs ever seen
    pub fn len(&self) -> usize {
        self.lock().jobs.len()
    }

    /// Returns true if no job has been created yet
    pub fn is_empty(&self) -> bool {
        self.lock().jobs.is_empty()
    }

    /// Counts jobs by state
    pub fn counts(&self) -> JobCounts {
        let inner = self.lock();
        let mut counts = JobCounts::default();
        for job in inner.jobs.values() {
            match job.state {
                JobState::Waiting => counts.waiting += 1,
                JobState::InProgress => counts.in_progress += 1,
                JobState::Done => counts.done += 1,
            }
        }
        counts
    }

    /// Returns every job, sorted by depth then URL
    pub fn jobs(&self) -> Vec<Job> {
        let mut jobs: Vec<Job> = self.lock().jobs.values().cloned().collect();
        jobs.sort_by(|a, b| a.depth.cmp(&b.depth).then_with(|| a.url.cmp(&b.url)));
        jobs
    }

    // A panic while the lock is held cannot leave Inner half-updated, so the
    // poisoned guard is still usable.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
