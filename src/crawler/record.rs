//! Result records reported to the tracker

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Reserved `meta` key holding the document title
pub const HTML_TITLE_KEY: &str = "html_title";

/// Structured report for one successfully fetched page
///
/// Field names on the wire are part of the tracker contract: the status code
/// is sent as `response` and the client identifier as `client`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    /// When the record was built (RFC 3339, UTC)
    pub time: DateTime<Utc>,

    /// The URL as issued by the tracker
    pub url: String,

    /// User-Agent the page was fetched with
    pub user_agent: String,

    /// HTTP status code of the response
    #[serde(rename = "response")]
    pub status_code: u16,

    /// Tracker username of this worker
    pub username: String,

    /// Crawler/client identifier
    #[serde(rename = "client")]
    pub client_id: String,

    /// Response headers, last value wins for repeated names
    pub headers: BTreeMap<String, String>,

    /// `<meta name content>` pairs plus the page title
    pub meta: BTreeMap<String, String>,

    /// Normalized anchor links, followed by any `Location` header value
    pub discovered_outlinks: Vec<String>,

    /// Normalized links from non-anchor elements
    pub discovered_embeds: Vec<String>,
}

impl ResultRecord {
    pub fn title(&self) -> Option<&str> {
        self.meta.get(HTML_TITLE_KEY).map(String::as_str)
    }
}
