//! Crawly Worker: a distributed-crawl worker
//!
//! This crate claims batches of URLs from a central tracker, fetches and parses
//! each page with a bounded pool of concurrent tasks, and reports the extracted
//! metadata and links back to the tracker in batches.

pub mod config;
pub mod crawler;
pub mod shutdown;
pub mod tracker;
pub mod url;

use thiserror::Error;

/// Main error type for Crawly Worker operations
#[derive(Debug, Error)]
pub enum CrawlyError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Tracker error: {0}")]
    Tracker(#[from] tracker::TrackerError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UrlError {
    #[error("Empty URL")]
    Empty,

    #[error("Fragment-only reference: {0}")]
    FragmentOnly(String),

    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,
}

/// Result type alias for Crawly Worker operations
pub type Result<T> = std::result::Result<T, CrawlyError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{Dispatcher, FetchOutcome, ResultRecord, SubmissionCache};
pub use url::{normalize_link, resolve_link};
