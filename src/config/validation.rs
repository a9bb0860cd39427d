use crate::config::types::{Config, CrawlerConfig, IdentityConfig, TrackerConfig};
use crate::ConfigError;
use url::Url;

/// Largest worker pool accepted
const MAX_POOL_SIZE: u32 = 10_000;

/// Largest per-page fetch or tracker request timeout accepted (seconds)
const MAX_FETCH_TIMEOUT_SECS: u64 = 300;

/// Smallest body cap accepted (bytes)
const MIN_BODY_BYTES: u64 = 1024;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_tracker_config(&config.tracker)?;
    validate_crawler_config(&config.crawler)?;
    validate_identity_config(&config.identity)?;
    Ok(())
}

/// Validates tracker configuration
fn validate_tracker_config(config: &TrackerConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.host)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid tracker host '{}': {}", config.host, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "Tracker host '{}' must use http or https",
            config.host
        )));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(ConfigError::InvalidUrl(format!(
            "Tracker host '{}' has no host",
            config.host
        )));
    }

    if config.username.is_empty() {
        return Err(ConfigError::Validation(
            "tracker username cannot be empty".to_string(),
        ));
    }

    if config.username.chars().any(char::is_whitespace) {
        return Err(ConfigError::Validation(format!(
            "tracker username must not contain whitespace, got '{}'",
            config.username
        )));
    }

    if config.request_timeout_secs < 1 || config.request_timeout_secs > MAX_FETCH_TIMEOUT_SECS {
        return Err(ConfigError::Validation(format!(
            "request_timeout_secs must be between 1 and {}, got {}",
            MAX_FETCH_TIMEOUT_SECS, config.request_timeout_secs
        )));
    }

    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.pool_size < 1 || config.pool_size > MAX_POOL_SIZE {
        return Err(ConfigError::Validation(format!(
            "pool_size must be between 1 and {}, got {}",
            MAX_POOL_SIZE, config.pool_size
        )));
    }

    if config.fetch_timeout_secs < 1 || config.fetch_timeout_secs > MAX_FETCH_TIMEOUT_SECS {
        return Err(ConfigError::Validation(format!(
            "fetch_timeout_secs must be between 1 and {}, got {}",
            MAX_FETCH_TIMEOUT_SECS, config.fetch_timeout_secs
        )));
    }

    if config.max_body_bytes < MIN_BODY_BYTES {
        return Err(ConfigError::Validation(format!(
            "max_body_bytes must be >= {}, got {}",
            MIN_BODY_BYTES, config.max_body_bytes
        )));
    }

    if config.submit_threshold < 1 {
        return Err(ConfigError::Validation(format!(
            "submit_threshold must be >= 1, got {}",
            config.submit_threshold
        )));
    }

    if config.backoff_initial_ms < 1 {
        return Err(ConfigError::Validation(format!(
            "backoff_initial_ms must be >= 1ms, got {}ms",
            config.backoff_initial_ms
        )));
    }

    if config.backoff_initial_ms > config.backoff_max_ms {
        return Err(ConfigError::Validation(format!(
            "backoff_initial_ms ({}ms) cannot exceed backoff_max_ms ({}ms)",
            config.backoff_initial_ms, config.backoff_max_ms
        )));
    }

    Ok(())
}

/// Validates identity configuration
fn validate_identity_config(config: &IdentityConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    if config.client_id.trim().is_empty() {
        return Err(ConfigError::Validation(
            "client_id cannot be empty".to_string(),
        ));
    }

    Ok(())
}
