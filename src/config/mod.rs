//! Configuration module for Crawly Worker
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every key has a default, so a worker can start without a file as long as the
//! required identity (tracker username) is supplied some other way.
//!
//! # Example
//!
//! ```no_run
//! use crawly_worker::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("worker.toml")).unwrap();
//! println!("Pool size: {}", config.crawler.pool_size);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlerConfig, IdentityConfig, TrackerConfig, DEFAULT_CLIENT_ID, DEFAULT_MAX_BODY_BYTES,
    DEFAULT_TRACKER_HOST, DEFAULT_TRACKER_TIMEOUT_SECS, DEFAULT_USER_AGENT,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, parse_config, parse_config_with_hash};
pub use validation::validate;
