//! Tracker protocol
//!
//! The tracker owns the crawl frontier. Workers claim batches of URLs from
//! `GET /jobs/queue` and report results to `POST /jobs/submit`. This module
//! holds the wire types and a typed client for both endpoints.

mod client;
mod types;

pub use client::TrackerClient;
pub use types::{CrawlUnit, QueueResponse, RejectionCode, SubmissionBatch, SubmitResponse};

use thiserror::Error;

/// Errors that can occur while talking to the tracker
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("Tracker request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Tracker returned HTTP {status} for {endpoint}")]
    Status { endpoint: &'static str, status: u16 },

    #[error("Failed to decode tracker response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid tracker URL: {0}")]
    InvalidUrl(String),

    #[error("Tracker rejected submission: {}", .0.join(", "))]
    Rejected(Vec<String>),
}

/// Result type for tracker operations
pub type TrackerResult<T> = Result<T, TrackerError>;
