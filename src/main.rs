//! Ripple-Crawl main entry point
//!
//! This is the command-line interface for the Ripple-Crawl crawl engine.

use anyhow::{bail, Context};
use clap::Parser;
use ripple_crawl::config::{compute_config_hash, read_config, Config};
use ripple_crawl::crawler::{Coordinator, HttpFetcher, VisitEvent, VisitHandler};
use ripple_crawl::output::{print_statistics, print_summary, ConsoleReporter};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Ripple-Crawl: a polite breadth-first crawler
///
/// Crawls outward from the seed URLs, one page per worker at a time, and
/// prints every visited page with its distance from the seeds.
#[derive(Parser, Debug)]
#[command(name = "ripple-crawl")]
#[command(version = "1.0.0")]
#[command(about = "A polite breadth-first crawler", long_about = None)]
struct Cli {
    /// Seed URLs (override the seeds of the configuration file)
    #[arg(value_name = "URL")]
    seeds: Vec<String>,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Number of concurrent workers
    #[arg(short, long)]
    workers: Option<usize>,

    /// Seconds each worker waits between fetches
    #[arg(short, long)]
    delay: Option<f64>,

    /// User-agent header to send
    #[arg(short, long, value_name = "USER_AGENT")]
    agent: Option<String>,

    /// Follow links to any host, not only the seed hosts
    #[arg(long)]
    any_host: bool,

    /// Print per-depth and error statistics when the crawl ends
    #[arg(long)]
    stats: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let config = build_config(&cli)?;
    let options = config.to_options().context("Invalid configuration")?;

    tracing::info!(
        "Seeds: {}, workers: {}, delay: {:?}",
        config.seeds.len(),
        options.workers,
        options.delay
    );

    let fetcher = HttpFetcher::new(&options.fetcher).context("Failed to build HTTP client")?;
    let coordinator = Coordinator::new(&config.seeds, options, Arc::new(fetcher))?;

    // Ctrl+C stops the workers and ends the crawl cleanly
    let shutdown = coordinator.shutdown_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            shutdown.abort();
        }
    });

    let mut reporter = ConsoleReporter::stderr();
    let summary = coordinator
        .run(|event: &VisitEvent| reporter.on_visit(event))
        .await
        .context("Crawl failed")?;

    print_summary(&summary);
    if cli.stats {
        print_statistics(reporter.statistics());
    }

    Ok(())
}

/// Loads the configuration file (if any) and applies command-line overrides
fn build_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let config = read_config(path)
                .with_context(|| format!("Failed to load {}", path.display()))?;
            let hash = compute_config_hash(path)?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => Config::default(),
    };

    if !cli.seeds.is_empty() {
        config.seeds = cli.seeds.clone();
    }
    if let Some(workers) = cli.workers {
        config.crawler.workers = workers;
    }
    if let Some(delay) = cli.delay {
        config.crawler.delay = delay;
    }
    if let Some(agent) = &cli.agent {
        config.crawler.user_agent = Some(agent.clone());
    }
    if cli.any_host {
        config.scope.restrict_to_seed_hosts = false;
    }

    if config.seeds.is_empty() {
        bail!("No seed URLs given; pass them as arguments or in the configuration file");
    }

    Ok(config)
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("ripple_crawl=info,warn"),
            1 => EnvFilter::new("ripple_crawl=debug,info"),
            2 => EnvFilter::new("ripple_crawl=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}
