use crate::crawler::FetcherSettings;
use crate::url::VisitPredicate;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// User-agent sent when the caller does not choose one
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (MSIE 9.0; Windows NT 6.1; Trident/5.0)";

/// Default pause between two fetches of the same worker
pub const DEFAULT_DELAY: Duration = Duration::from_secs(1);

/// Default number of workers
pub const DEFAULT_WORKERS: usize = 1;

/// Runtime options for one crawl invocation
///
/// Validated once when the crawl starts and immutable afterwards.
///
/// # Example
///
/// ```
/// use ripple_crawl::config::CrawlOptions;
/// use ripple_crawl::url::HostScope;
/// use std::time::Duration;
/// use url::Url;
///
/// let seed = Url::parse("https://example.com/").unwrap();
/// let options = CrawlOptions::default()
///     .with_workers(4)
///     .with_delay(Duration::from_millis(250))
///     .with_visit(HostScope::from_seeds([&seed]));
///
/// assert!(options.should_visit(&Url::parse("https://example.com/about").unwrap()));
/// assert!(!options.should_visit(&Url::parse("https://other.com/").unwrap()));
/// ```
#[derive(Clone)]
pub struct CrawlOptions {
    /// Decides whether a discovered link is queued; `None` accepts all
    pub visit: Option<Arc<dyn VisitPredicate>>,

    /// Pause after each fetch, per worker
    pub delay: Duration,

    /// Number of concurrent workers (must be at least 1)
    pub workers: usize,

    /// User-agent header sent with every request
    pub user_agent: String,

    /// Settings for the default HTTP fetcher
    pub fetcher: FetcherSettings,
}

impl Default for CrawlOptions {
    fn default() -> Self {
        Self {
            visit: None,
            delay: DEFAULT_DELAY,
            workers: DEFAULT_WORKERS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            fetcher: FetcherSettings::default(),
        }
    }
}

impl fmt::Debug for CrawlOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CrawlOptions")
            .field("visit", &self.visit.as_ref().map(|_| "<predicate>"))
            .field("delay", &self.delay)
            .field("workers", &self.workers)
            .field("user_agent", &self.user_agent)
            .field("fetcher", &self.fetcher)
            .finish()
    }
}

impl CrawlOptions {
    pub fn with_visit(mut self, predicate: impl VisitPredicate + 'static) -> Self {
        self.visit = Some(Arc::new(predicate));
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_fetcher_settings(mut self, settings: FetcherSettings) -> Self {
        self.fetcher = settings;
        self
    }

    /// Applies the visit predicate, accepting everything when none is set
    pub fn should_visit(&self, url: &Url) -> bool {
        self.visit
            .as_ref()
            .map(|predicate| predicate.should_visit(url))
            .unwrap_or(true)
    }
}
