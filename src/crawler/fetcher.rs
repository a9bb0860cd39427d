//! HTTP fetcher implementation
//!
//! This module handles page requests for the crawler, including:
//! - Building HTTP clients with the configured user agent and timeout
//! - Single GET requests with redirect following disabled
//! - Content-Type screening
//! - Capped body reads
//! - Transport error classification

use reqwest::header::{HeaderMap, CONTENT_TYPE};
use crate::config::DEFAULT_MAX_BODY_BYTES;
use reqwest::{redirect::Policy, Client, Response};
use std::error::Error as StdError;
use std::fmt;
use std::io;
use std::time::Duration;
use url::Url;

/// A fetched page and the response metadata the result builder needs
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// The URL that was requested
    pub url: String,

    /// HTTP status code, redirects included
    pub status_code: u16,

    /// Response headers in arrival order, duplicates preserved
    pub headers: Vec<(String, String)>,

    /// Decoded response body
    pub body: String,
}

/// Result of a fetch operation
#[derive(Debug)]
pub enum FetchOutcome {
    /// A response was received; any status code counts
    Success(FetchedPage),

    /// The response is not something the result builder can parse
    Skipped(SkipReason),

    /// No usable response was received
    Failed(FailureReason),
}

/// Why a response was not parsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Content-Type outside text and XML documents
    UnsupportedContentType(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedContentType(content_type) => {
                write!(f, "unsupported content type {}", content_type)
            }
        }
    }
}

/// Transport-level failure classes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    /// The unit URL could not be parsed
    InvalidUrl,
    /// TLS handshake or certificate failure
    Tls,
    /// The remote host refused the connection
    ConnectionRefused,
    /// The request exceeded the fetch timeout
    Timeout,
    /// DNS resolution failed
    UnknownHost,
    /// Any other connection-level failure
    Socket,
    /// Failure while sending the request or reading the body
    Io,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::InvalidUrl => "invalid URL",
            Self::Tls => "TLS failure",
            Self::ConnectionRefused => "connection refused",
            Self::Timeout => "timeout",
            Self::UnknownHost => "unknown host",
            Self::Socket => "socket error",
            Self::Io => "I/O error",
        };
        f.write_str(text)
    }
}

/// Builds the HTTP client used for page fetches
///
/// Redirects are never followed: a 3xx response is reported as-is so that its
/// `Location` header ends up in the result record.
///
/// # Arguments
///
/// * `user_agent` - User-Agent header value
/// * `timeout` - Total time allowed for one request, body included
pub fn build_http_client(user_agent: &str, timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .redirect(Policy::none())
        .gzip(true)
        .brotli(true)
        .build()
}

/// Page fetcher shared by all worker tasks
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    max_body_bytes: usize,
}

impl Fetcher {
    /// Creates a fetcher with the default body cap
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(user_agent, timeout)?,
            max_body_bytes: usize::try_from(DEFAULT_MAX_BODY_BYTES).unwrap_or(usize::MAX),
        })
    }

    /// Truncates response bodies to `max_body_bytes`
    pub fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }

    /// Fetches one page
    ///
    /// # Outcome Mapping
    ///
    /// | Condition | Outcome |
    /// |-----------|---------|
    /// | Any HTTP status with a parseable content type | Success |
    /// | Non-text, non-XML Content-Type | Skipped |
    /// | Unparseable URL | Failed(InvalidUrl) |
    /// | Transport error | Failed(classified) |
    ///
    /// Bodies longer than the cap are truncated, not rejected. Nothing is retried.
    pub async fn fetch(&self, url: &str) -> FetchOutcome {
        let target = match Url::parse(url) {
            Ok(target) => target,
            Err(e) => {
                tracing::debug!("Cannot fetch {}: {}", url, e);
                return FetchOutcome::Failed(FailureReason::InvalidUrl);
            }
        };

        let response = match self.client.get(target).send().await {
            Ok(response) => response,
            Err(e) => {
                let reason = classify_error(&e);
                tracing::debug!("Fetch of {} failed ({}): {}", url, reason, e);
                return FetchOutcome::Failed(reason);
            }
        };

        let status_code = response.status().as_u16();
        let content_type = header_value(response.headers(), CONTENT_TYPE.as_str());
        if let Some(content_type) = content_type {
            if !is_supported_content_type(&content_type) {
                return FetchOutcome::Skipped(SkipReason::UnsupportedContentType(content_type));
            }
        }

        let headers = collect_header_pairs(response.headers());

        match read_capped_body(response, self.max_body_bytes).await {
            Ok((body, truncated)) => {
                if truncated {
                    tracing::debug!("Truncated body of {} to {} bytes", url, self.max_body_bytes);
                }
                FetchOutcome::Success(FetchedPage {
                    url: url.to_string(),
                    status_code,
                    headers,
                    body,
                })
            }
            Err(e) => {
                let reason = classify_error(&e);
                tracing::debug!("Reading body of {} failed ({}): {}", url, reason, e);
                FetchOutcome::Failed(reason)
            }
        }
    }
}

/// Reads at most `limit` bytes of the body, chunk by chunk
///
/// Returns the decoded body and whether anything was cut off. Reading stops as
/// soon as the limit is reached, so an oversized body is never fully buffered.
async fn read_capped_body(
    mut response: Response,
    limit: usize,
) -> Result<(String, bool), reqwest::Error> {
    let expected = response
        .content_length()
        .and_then(|len| usize::try_from(len).ok())
        .unwrap_or(0);
    let mut buf = Vec::with_capacity(expected.min(limit));
    let mut truncated = false;

    while let Some(chunk) = response.chunk().await? {
        let room = limit - buf.len();
        if chunk.len() >= room {
            buf.extend_from_slice(&chunk[..room]);
            truncated = chunk.len() > room || expected > limit;
            break;
        }
        buf.extend_from_slice(&chunk);
    }

    Ok((String::from_utf8_lossy(&buf).into_owned(), truncated))
}

/// Returns true for document types the result builder can parse
///
/// Missing types, `text/*`, `application/xml` and `application/*+xml` are accepted.
pub fn is_supported_content_type(content_type: &str) -> bool {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();

    mime.is_empty()
        || mime.starts_with("text/")
        || mime == "application/xml"
        || (mime.starts_with("application/") && mime.ends_with("+xml"))
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
}

fn collect_header_pairs(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect()
}

/// Classifies a reqwest error into a failure class
pub fn classify_error(err: &reqwest::Error) -> FailureReason {
    classify_failure(err.is_timeout(), err.is_connect(), err)
}

/// Classifies a transport failure by walking its error chain
///
/// Split out from [`classify_error`] so classification can be exercised
/// without a network round trip.
pub fn classify_failure(
    is_timeout: bool,
    is_connect: bool,
    err: &(dyn StdError + 'static),
) -> FailureReason {
    if is_timeout {
        return FailureReason::Timeout;
    }

    let mut current: Option<&(dyn StdError + 'static)> = Some(err);
    while let Some(e) = current {
        if let Some(io_err) = e.downcast_ref::<io::Error>() {
            match io_err.kind() {
                io::ErrorKind::ConnectionRefused => return FailureReason::ConnectionRefused,
                io::ErrorKind::TimedOut => return FailureReason::Timeout,
                _ => {}
            }
        }

        let message = e.to_string().to_ascii_lowercase();
        if message.contains("dns error")
            || message.contains("failed to lookup address")
            || message.contains("name or service not known")
            || message.contains("no such host")
        {
            return FailureReason::UnknownHost;
        }
        if message.contains("certificate")
            || message.contains("tls")
            || message.contains("handshake")
        {
            return FailureReason::Tls;
        }

        current = e.source();
    }

    if is_connect {
        FailureReason::Socket
    } else {
        FailureReason::Io
    }
}
