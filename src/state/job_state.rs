/// Job state definitions for tracking crawl progress
///
/// A job only ever moves forward: `Waiting → InProgress → Done`.
use std::fmt;

/// Represents the current state of a job in the crawl process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobState {
    /// Job has been discovered and is waiting for a worker
    Waiting,

    /// A worker has claimed the job and is fetching it
    InProgress,

    /// The job has been fetched (successfully or not), or recorded as a
    /// redirect target that needs no fetch of its own
    Done,
}

impl JobState {
    /// Returns true if this is a terminal state (no further processing needed)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// Returns true if `next` is a legal successor of this state
    ///
    /// Only the forward edges are legal; staying in place is not a transition.
    pub fn can_transition_to(&self, next: JobState) -> bool {
        matches!(
            (self, next),
            (Self::Waiting, Self::InProgress) | (Self::InProgress, Self::Done)
        )
    }

    /// Returns a short lowercase label for logging
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::InProgress => "in_progress",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
