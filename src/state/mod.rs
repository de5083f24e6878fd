//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `JobState`: The forward-only lifecycle of a single job
//! - `JobTable`: The shared URL → job map that all workers claim from

mod job_state;
mod job_table;

// Re-export main types
pub use job_state::JobState;
pub use job_table::{Claim, Job, JobCounts, JobTable};
