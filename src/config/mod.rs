//! Configuration module for Ripple-Crawl
//!
//! Two layers live here: [`CrawlOptions`], the validated runtime options of a
//! single crawl, and [`Config`], the TOML file the command-line tool reads and
//! turns into options.
//!
//! # Example
//!
//! ```no_run
//! use ripple_crawl::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("crawl.toml")).unwrap();
//! let options = config.to_options().unwrap();
//! println!("Crawling with {} workers", options.workers);
//! ```

mod options;
mod parser;
mod types;
mod validation;

// Re-export types
pub use options::{CrawlOptions, DEFAULT_DELAY, DEFAULT_USER_AGENT, DEFAULT_WORKERS};
pub use types::{Config, CrawlerConfig, ScopeConfig};
pub use validation::{parse_seeds, validate, validate_options, MAX_DELAY_SECS, MAX_WORKERS};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config, read_config};
