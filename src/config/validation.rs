use crate::config::options::CrawlOptions;
use crate::config::types::{Config, CrawlerConfig, ScopeConfig};
use crate::url::parse_seed;
use crate::ConfigError;
use url::Url;

/// Upper bound on the worker pool
pub const MAX_WORKERS: usize = 1024;

/// Upper bound on the per-worker delay (seconds)
pub const MAX_DELAY_SECS: f64 = 3600.0;

/// Validates the entire configuration file
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    parse_seeds(&config.seeds)?;
    validate_crawler_config(&config.crawler)?;
    validate_scope_config(&config.scope)?;
    Ok(())
}

/// Validates runtime crawl options before any worker starts
pub fn validate_options(options: &CrawlOptions) -> Result<(), ConfigError> {
    validate_workers(options.workers)?;

    if options.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    if options.fetcher.request_timeout.is_zero() || options.fetcher.connect_timeout.is_zero() {
        return Err(ConfigError::Validation(
            "fetch timeouts must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

/// Parses and validates a seed list
///
/// The list must be non-empty and every entry must be an absolute
/// `http`/`https` URL.
pub fn parse_seeds<S: AsRef<str>>(seeds: &[S]) -> Result<Vec<Url>, ConfigError> {
    if seeds.is_empty() {
        return Err(ConfigError::Validation(
            "at least one seed URL is required".to_string(),
        ));
    }

    seeds
        .iter()
        .map(|seed| {
            parse_seed(seed.as_ref()).map_err(|e| {
                ConfigError::InvalidUrl(format!("Invalid seed URL '{}': {}", seed.as_ref(), e))
            })
        })
        .collect()
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    validate_workers(config.workers)?;

    if !config.delay.is_finite() || config.delay < 0.0 {
        return Err(ConfigError::Validation(format!(
            "delay must be a non-negative number of seconds, got {}",
            config.delay
        )));
    }

    if config.delay > MAX_DELAY_SECS {
        return Err(ConfigError::Validation(format!(
            "delay must be at most {}s, got {}s",
            MAX_DELAY_SECS, config.delay
        )));
    }

    if config.request_timeout == 0 || config.connect_timeout == 0 {
        return Err(ConfigError::Validation(
            "request-timeout and connect-timeout must be >= 1 second".to_string(),
        ));
    }

    if let Some(agent) = &config.user_agent {
        if agent.trim().is_empty() {
            return Err(ConfigError::Validation(
                "user-agent cannot be empty".to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_workers(workers: usize) -> Result<(), ConfigError> {
    if workers < 1 || workers > MAX_WORKERS {
        return Err(ConfigError::Validation(format!(
            "workers must be between 1 and {}, got {}",
            MAX_WORKERS, workers
        )));
    }
    Ok(())
}

/// Validates scope configuration
fn validate_scope_config(config: &ScopeConfig) -> Result<(), ConfigError> {
    for pattern in &config.allow {
        validate_host_pattern(pattern)?;
    }
    Ok(())
}

/// Validates a host pattern (supports a leading `*.` wildcard)
fn validate_host_pattern(pattern: &str) -> Result<(), ConfigError> {
    if pattern.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Host pattern cannot be empty".to_string(),
        ));
    }

    validate_host_string(pattern.strip_prefix("*.").unwrap_or(pattern))
}

/// Validates a host string (without wildcard prefix)
fn validate_host_string(host: &str) -> Result<(), ConfigError> {
    if host.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Host cannot be empty".to_string(),
        ));
    }

    if !host
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Host '{}' contains invalid characters",
            host
        )));
    }

    if host.starts_with('.') || host.ends_with('.') || host.starts_with('-') || host.ends_with('-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Host '{}' cannot start or end with '.' or '-'",
            host
        )));
    }

    if host.contains("..") {
        return Err(ConfigError::InvalidPattern(format!(
            "Host '{}' cannot contain consecutive dots",
            host
        )));
    }

    Ok(())
}
