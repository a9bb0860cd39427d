//! Crawler module for the crawl-dispatch engine
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with failure classification
//! - Result building from fetched documents
//! - Batched, best-effort submission of results
//! - The dispatch loop that keeps the worker pool full

mod backoff;
mod cache;
mod dispatch;
mod extract;
mod fetcher;
mod record;
mod worker;

pub use backoff::Backoff;
pub use cache::{CacheStats, SubmissionCache};
pub use dispatch::{CycleOutcome, Dispatcher};
pub use extract::{
    collect_headers, extract_embeds, extract_meta, extract_outlinks, extract_title, RecordBuilder,
};
pub use fetcher::{
    build_http_client, classify_error, classify_failure, is_supported_content_type,
    FailureReason, FetchOutcome, FetchedPage, Fetcher, SkipReason,
};
pub use record::{ResultRecord, HTML_TITLE_KEY};
pub use worker::{CrawlWorker, UnitDisposition};

use crate::config::Config;
use crate::CrawlyError;
use std::future::Future;

/// Runs the worker until `shutdown` completes
///
/// This is the main entry point for a worker process. It will:
/// 1. Build the tracker client, fetcher and submission cache
/// 2. Dispatch claimed units until shutdown is requested
/// 3. Flush whatever results are still buffered
///
/// # Arguments
///
/// * `config` - The validated worker configuration
/// * `shutdown` - Completes when the worker should stop
///
/// # Returns
///
/// * `Ok(CacheStats)` - Submission counters at exit
/// * `Err(CrawlyError)` - The worker could not be started
pub async fn run_worker<F>(config: Config, shutdown: F) -> Result<CacheStats, CrawlyError>
where
    F: Future<Output = ()>,
{
    let mut dispatcher = Dispatcher::new(&config)?;
    let cache = dispatcher.cache();

    dispatcher.run(shutdown).await;

    let pending = cache.pending();
    if pending > 0 {
        tracing::info!("Flushing {} buffered results", pending);
        cache.flush().await;
    }

    let stats = cache.stats();
    tracing::info!(
        "Worker stopped: {} results submitted in {} batches, {} dropped",
        stats.submitted,
        stats.batches,
        stats.dropped
    );
    Ok(stats)
}
