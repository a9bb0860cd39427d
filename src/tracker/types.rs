use crate::crawler::ResultRecord;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One URL assigned to this worker by the tracker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlUnit {
    pub url: String,
}

impl CrawlUnit {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

/// Body of `GET /jobs/queue`
#[derive(Debug, Clone, Deserialize)]
pub struct QueueResponse {
    pub urls: Vec<String>,
}

impl QueueResponse {
    pub fn into_units(self) -> Vec<CrawlUnit> {
        self.urls.into_iter().map(CrawlUnit::new).collect()
    }
}

/// Body of `POST /jobs/submit`
#[derive(Debug, Clone, Default, Serialize)]
pub struct SubmissionBatch {
    pub items: Vec<ResultRecord>,
}

impl SubmissionBatch {
    pub fn new(items: Vec<ResultRecord>) -> Self {
        Self { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Tracker reply to a submission
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitResponse {
    pub success: bool,
    #[serde(default)]
    pub error: Vec<String>,
}

/// Error codes the tracker reports for rejected submissions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectionCode {
    /// A record failed the tracker's schema checks
    BadData,
    /// A record's timestamp was missing or out of range
    InvalidTime,
    /// Any code this worker does not know about
    Other(String),
}

impl RejectionCode {
    pub fn parse(code: &str) -> Self {
        match code {
            "BAD_DATA" => Self::BadData,
            "INVALID_TIME" => Self::InvalidTime,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

impl fmt::Display for RejectionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadData => f.write_str("BAD_DATA"),
            Self::InvalidTime => f.write_str("INVALID_TIME"),
            Self::Other(code) => f.write_str(code),
        }
    }
}
