//! Crawler module for web page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching behind the [`Fetcher`] trait
//! - HTML link extraction
//! - The worker pool draining the job table
//! - Overall crawl coordination and cancellation

mod coordinator;
mod fetcher;
mod parser;
mod worker;

pub use coordinator::{
    crawl, Coordinator, CrawlControl, CrawlSummary, ShutdownHandle, VisitEvent, VisitHandler,
};
pub use fetcher::{
    build_http_client, FetchError, FetchResult, Fetcher, FetcherSettings, HttpFetcher, Response,
};
pub use parser::{discover_links, extract_hrefs};
pub use worker::{WorkerReport, WorkerState};
