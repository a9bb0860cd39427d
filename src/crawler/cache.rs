//! Submission cache: batches result records on their way to the tracker

use crate::crawler::record::ResultRecord;
use crate::tracker::{RejectionCode, SubmissionBatch, TrackerClient, TrackerError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Counters describing what happened to cached records
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Records the tracker accepted
    pub submitted: u64,
    /// Records lost to failed or rejected submissions
    pub dropped: u64,
    /// Number of submission calls made
    pub batches: u64,
}

/// Buffer of completed records shared by all worker tasks
///
/// `add` and `flush` are the only ways to touch the buffer. Both take the
/// buffer contents under one lock, so a record lands in exactly one batch.
/// Submission is at-most-once: a failed batch is logged and dropped.
pub struct SubmissionCache {
    buffer: Mutex<Vec<ResultRecord>>,
    threshold: usize,
    tracker: Arc<TrackerClient>,
    submitted: AtomicU64,
    dropped: AtomicU64,
    batches: AtomicU64,
}

impl SubmissionCache {
    /// Creates a cache that submits once `threshold` records are buffered
    pub fn new(tracker: Arc<TrackerClient>, threshold: usize) -> Self {
        let threshold = threshold.max(1);
        Self {
            buffer: Mutex::new(Vec::with_capacity(threshold)),
            threshold,
            tracker,
            submitted: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            batches: AtomicU64::new(0),
        }
    }

    /// Buffers a record, submitting from the calling task when the threshold is reached
    pub async fn add(&self, record: ResultRecord) {
        let full = {
            let mut buffer = self.lock();
            buffer.push(record);
            if buffer.len() >= self.threshold {
                Some(std::mem::take(&mut *buffer))
            } else {
                None
            }
        };

        if let Some(items) = full {
            self.submit(items).await;
        }
    }

    /// Submits whatever is buffered, if anything
    pub async fn flush(&self) {
        let items = std::mem::take(&mut *self.lock());
        if !items.is_empty() {
            self.submit(items).await;
        }
    }

    /// Number of records waiting for the next submission
    pub fn pending(&self) -> usize {
        self.lock().len()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            submitted: self.submitted.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            batches: self.batches.load(Ordering::Relaxed),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<ResultRecord>> {
        // A panicking task cannot leave the Vec half-updated
        self.buffer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn submit(&self, items: Vec<ResultRecord>) {
        let batch = SubmissionBatch::new(items);
        let count = batch.len() as u64;
        self.batches.fetch_add(1, Ordering::Relaxed);

        match self.tracker.submit(&batch).await {
            Ok(()) => {
                self.submitted.fetch_add(count, Ordering::Relaxed);
                tracing::debug!("Submitted batch of {} results", count);
            }
            Err(TrackerError::Rejected(codes)) => {
                self.dropped.fetch_add(count, Ordering::Relaxed);
                for code in codes.iter().map(|code| RejectionCode::parse(code)) {
                    if code.is_known() {
                        tracing::warn!("Tracker reported {} for submitted batch", code);
                    }
                }
                tracing::error!(
                    "Tracker rejected batch of {} results: {}",
                    count,
                    codes.join(", ")
                );
            }
            Err(e) => {
                self.dropped.fetch_add(count, Ordering::Relaxed);
                tracing::warn!("Dropping batch of {} results: {}", count, e);
            }
        }
    }
}
