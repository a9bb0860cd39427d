//! Crawly Worker main entry point
//!
//! This is the command-line interface for the distributed-crawl worker.

use anyhow::Context;
use clap::Parser;
use crawly_worker::config::{parse_config_with_hash, validate, Config};
use crawly_worker::crawler::run_worker;
use crawly_worker::shutdown::ShutdownSignal;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Crawly Worker: a distributed-crawl worker
///
/// Claims URLs from a tracker, fetches and parses each page with a bounded
/// pool of concurrent tasks, and submits extracted metadata and links back to
/// the tracker in batches.
#[derive(Parser, Debug)]
#[command(name = "crawly-worker")]
#[command(version)]
#[command(about = "A distributed-crawl worker", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (defaults apply when omitted)
    #[arg(value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Tracker base URL, overriding the config file
    #[arg(long, value_name = "URL")]
    tracker: Option<String>,

    /// Tracker username, overriding the config file
    #[arg(long, value_name = "NAME")]
    username: Option<String>,

    /// Maximum concurrent fetches, overriding the config file
    #[arg(long, value_name = "N")]
    pool_size: Option<u32>,

    /// Validate the configuration, print it and exit
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = parse_config_with_hash(path)
                .with_context(|| format!("failed to load {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => {
            tracing::info!("No configuration file given, using defaults");
            Config::default()
        }
    };

    apply_overrides(&mut config, &cli);
    validate(&config).context("invalid configuration")?;

    if cli.check {
        print_config(&config);
        return Ok(());
    }

    tracing::info!(
        "Worker '{}' claiming from {} with {} slots",
        config.tracker.username,
        config.tracker.host,
        config.crawler.pool_size
    );

    let mut signal = ShutdownSignal::listen().context("failed to install signal handlers")?;
    let shutdown = async move {
        let reason = signal.recv().await;
        tracing::info!("Received {}, shutting down", reason);
    };

    run_worker(config, shutdown).await?;
    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("crawly_worker=info,warn"),
            1 => EnvFilter::new("crawly_worker=debug,info"),
            2 => EnvFilter::new("crawly_worker=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

fn apply_overrides(config: &mut Config, cli: &Cli) {
    if let Some(tracker) = &cli.tracker {
        config.tracker.host = tracker.clone();
    }
    if let Some(username) = &cli.username {
        config.tracker.username = username.clone();
    }
    if let Some(pool_size) = cli.pool_size {
        config.crawler.pool_size = pool_size;
    }
}

/// Handles --check: shows the effective configuration
fn print_config(config: &Config) {
    println!("=== Crawly Worker Configuration ===\n");

    println!("Tracker:");
    println!("  Host: {}", config.tracker.host);
    println!("  Username: {}", config.tracker.username);
    println!("  Request timeout: {}s", config.tracker.request_timeout_secs);

    println!("\nCrawler:");
    println!("  Pool size: {}", config.crawler.pool_size);
    println!("  Fetch timeout: {}s", config.crawler.fetch_timeout_secs);
    println!("  Max body size: {} bytes", config.crawler.max_body_bytes);
    println!("  Submit threshold: {}", config.crawler.submit_threshold);
    println!(
        "  Claim backoff: {}ms to {}ms",
        config.crawler.backoff_initial_ms, config.crawler.backoff_max_ms
    );

    println!("\nIdentity:");
    println!("  User agent: {}", config.identity.user_agent);
    println!("  Client id: {}", config.identity.client_id);

    println!("\n✓ Configuration is valid");
}
