use serde::Deserialize;
use std::time::Duration;

/// User agent sent with every page fetch and tracker request
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/114.0.0.0 Safari/537.36 CrawlyProjectCrawler/0.0.4 (email crawlyproject@digitaldragon.dev)";

/// Crawler identifier reported in every result record
pub const DEFAULT_CLIENT_ID: &str = "crawlyprojectofficial 0.0.6";

/// Tracker used when none is configured
pub const DEFAULT_TRACKER_HOST: &str = "http://localhost:4567";

/// Time allowed for one tracker request (seconds)
pub const DEFAULT_TRACKER_TIMEOUT_SECS: u64 = 60;

/// Largest response body read from a crawled page (bytes)
pub const DEFAULT_MAX_BODY_BYTES: u64 = 2 * 1024 * 1024;

/// Main configuration structure for Crawly Worker
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub tracker: TrackerConfig,
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub identity: IdentityConfig,
}

/// Tracker connection configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Base URL of the tracker service
    pub host: String,

    /// Username reported when claiming and submitting work
    pub username: String,

    /// Time allowed for one claim or submit request (seconds)
    #[serde(rename = "request-timeout-secs")]
    pub request_timeout_secs: u64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_TRACKER_HOST.to_string(),
            username: String::new(),
            request_timeout_secs: DEFAULT_TRACKER_TIMEOUT_SECS,
        }
    }
}

impl TrackerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Worker pool and batching configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Maximum number of concurrent fetch tasks
    #[serde(rename = "pool-size")]
    pub pool_size: u32,

    /// Per-page fetch timeout (seconds)
    #[serde(rename = "fetch-timeout-secs")]
    pub fetch_timeout_secs: u64,

    /// Response bodies are truncated to this many bytes
    #[serde(rename = "max-body-bytes")]
    pub max_body_bytes: u64,

    /// Number of buffered results that triggers a submission
    #[serde(rename = "submit-threshold")]
    pub submit_threshold: u32,

    /// First delay after a failed or empty tracker claim (milliseconds)
    #[serde(rename = "backoff-initial-ms")]
    pub backoff_initial_ms: u64,

    /// Upper bound for the claim backoff (milliseconds)
    #[serde(rename = "backoff-max-ms")]
    pub backoff_max_ms: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            pool_size: 200,
            fetch_timeout_secs: 15,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            submit_threshold: 5,
            backoff_initial_ms: 250,
            backoff_max_ms: 30_000,
        }
    }
}

impl CrawlerConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    /// Body cap as a buffer length
    pub fn max_body_len(&self) -> usize {
        usize::try_from(self.max_body_bytes).unwrap_or(usize::MAX)
    }

    pub fn backoff_initial(&self) -> Duration {
        Duration::from_millis(self.backoff_initial_ms)
    }

    pub fn backoff_max(&self) -> Duration {
        Duration::from_millis(self.backoff_max_ms)
    }
}

/// Identification strings sent to crawled sites and the tracker
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// User-Agent header value
    #[serde(rename = "user-agent")]
    pub user_agent: String,

    /// Crawler/client identifier stored in each result record
    #[serde(rename = "client-id")]
    pub client_id: String,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            client_id: DEFAULT_CLIENT_ID.to_string(),
        }
    }
}
