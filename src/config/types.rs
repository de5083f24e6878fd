use crate::config::options::{CrawlOptions, DEFAULT_USER_AGENT};
use crate::config::validation::{parse_seeds, validate};
use crate::crawler::FetcherSettings;
use crate::url::HostScope;
use crate::ConfigError;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

/// Main configuration file structure for Ripple-Crawl
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Seed URLs the crawl starts from (depth 0)
    #[serde(default)]
    pub seeds: Vec<String>,

    #[serde(default)]
    pub crawler: CrawlerConfig,

    #[serde(default)]
    pub scope: ScopeConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Number of concurrent workers
    pub workers: usize,

    /// Seconds each worker waits between two of its own fetches
    pub delay: f64,

    /// User-agent header sent with every request
    #[serde(rename = "user-agent")]
    pub user_agent: Option<String>,

    /// Whole-request timeout (seconds)
    #[serde(rename = "request-timeout")]
    pub request_timeout: u64,

    /// Connection timeout (seconds)
    #[serde(rename = "connect-timeout")]
    pub connect_timeout: u64,

    /// Maximum redirect hops followed per fetch
    #[serde(rename = "max-redirects")]
    pub max_redirects: usize,

    /// Skip TLS certificate verification
    #[serde(rename = "accept-invalid-certs")]
    pub accept_invalid_certs: bool,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        let fetcher = FetcherSettings::default();
        Self {
            workers: 1,
            delay: 1.0,
            user_agent: None,
            request_timeout: fetcher.request_timeout.as_secs(),
            connect_timeout: fetcher.connect_timeout.as_secs(),
            max_redirects: fetcher.max_redirects,
            accept_invalid_certs: fetcher.accept_invalid_certs,
        }
    }
}

/// Which discovered links are followed
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScopeConfig {
    /// Only follow links whose host is one of the seed hosts (or `allow`)
    #[serde(rename = "restrict-to-seed-hosts")]
    pub restrict_to_seed_hosts: bool,

    /// Extra host patterns to follow, e.g. `"*.example.org"`
    pub allow: Vec<String>,
}

impl Default for ScopeConfig {
    fn default() -> Self {
        Self {
            restrict_to_seed_hosts: true,
            allow: Vec::new(),
        }
    }
}

impl Config {
    /// Parses the seed list into canonical URLs
    pub fn seed_urls(&self) -> Result<Vec<Url>, ConfigError> {
        parse_seeds(&self.seeds)
    }

    /// Builds the runtime crawl options described by this configuration
    ///
    /// The visit predicate is a [`HostScope`] made of the seed hosts (when
    /// `restrict-to-seed-hosts` is set) plus the `allow` patterns. With no
    /// restriction and no patterns every link is followed.
    ///
    /// The configuration is validated first.
    pub fn to_options(&self) -> Result<CrawlOptions, ConfigError> {
        validate(self)?;
        let seeds = self.seed_urls()?;

        let mut options = CrawlOptions::default()
            .with_workers(self.crawler.workers)
            .with_delay(Duration::from_secs_f64(self.crawler.delay))
            .with_user_agent(
                self.crawler
                    .user_agent
                    .clone()
                    .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            );

        options.fetcher = FetcherSettings {
            connect_timeout: Duration::from_secs(self.crawler.connect_timeout),
            request_timeout: Duration::from_secs(self.crawler.request_timeout),
            max_redirects: self.crawler.max_redirects,
            accept_invalid_certs: self.crawler.accept_invalid_certs,
        };

        if self.scope.restrict_to_seed_hosts || !self.scope.allow.is_empty() {
            let mut scope = if self.scope.restrict_to_seed_hosts {
                HostScope::from_seeds(&seeds)
            } else {
                HostScope::new()
            };
            for pattern in &self.scope.allow {
                scope = scope.allow(pattern.clone());
            }
            options = options.with_visit(scope);
        }

        Ok(options)
    }
}
