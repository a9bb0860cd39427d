//! Result building: turns a fetched page into a [`ResultRecord`]
//!
//! This module handles parsing the fetched document to extract:
//! - Response headers (one value per name)
//! - `<meta>` name/content pairs and the page title
//! - Outlinks from anchors, followed by any redirect target
//! - Embeds from every other element carrying `href` or `src`

use crate::config::IdentityConfig;
use crate::crawler::fetcher::FetchedPage;
use crate::crawler::record::{ResultRecord, HTML_TITLE_KEY};
use crate::url::resolve_link;
use chrono::{DateTime, Utc};
use scraper::{ElementRef, Html, Selector};
use std::collections::{BTreeMap, BTreeSet};
use url::Url;

/// Builds result records stamped with this worker's identity
#[derive(Debug, Clone)]
pub struct RecordBuilder {
    user_agent: String,
    client_id: String,
    username: String,
}

impl RecordBuilder {
    pub fn new(identity: &IdentityConfig, username: &str) -> Self {
        Self {
            user_agent: identity.user_agent.clone(),
            client_id: identity.client_id.clone(),
            username: username.to_string(),
        }
    }

    /// Builds the record for a fetched page, timestamped now
    pub fn build(&self, page: &FetchedPage) -> ResultRecord {
        self.build_at(page, Utc::now())
    }

    /// Builds the record for a fetched page with an explicit timestamp
    ///
    /// Links that fail to normalize are dropped individually; if the page URL
    /// itself cannot serve as a base, the record carries no links.
    pub fn build_at(&self, page: &FetchedPage, time: DateTime<Utc>) -> ResultRecord {
        let document = Html::parse_document(&page.body);
        let base = match Url::parse(&page.url) {
            Ok(base) => Some(base),
            Err(e) => {
                tracing::debug!("Cannot resolve links against {}: {}", page.url, e);
                None
            }
        };

        let mut meta = extract_meta(&document);
        meta.insert(HTML_TITLE_KEY.to_string(), extract_title(&document));

        let mut discovered_outlinks = extract_outlinks(&document, base.as_ref());
        discovered_outlinks.extend(location_values(&page.headers));

        ResultRecord {
            time,
            url: page.url.clone(),
            user_agent: self.user_agent.clone(),
            status_code: page.status_code,
            username: self.username.clone(),
            client_id: self.client_id.clone(),
            headers: collect_headers(&page.headers),
            meta,
            discovered_outlinks,
            discovered_embeds: extract_embeds(&document, base.as_ref()),
        }
    }
}

/// Folds headers into one value per name; a repeated name keeps its last value
pub fn collect_headers(headers: &[(String, String)]) -> BTreeMap<String, String> {
    headers
        .iter()
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect()
}

/// Values of every `Location` header, compared case-insensitively
fn location_values(headers: &[(String, String)]) -> impl Iterator<Item = String> + '_ {
    headers
        .iter()
        .filter(|(name, _)| name.eq_ignore_ascii_case("location"))
        .map(|(_, value)| value.clone())
}

/// Extracts `<meta name=".." content="..">` pairs with both sides non-empty
pub fn extract_meta(document: &Html) -> BTreeMap<String, String> {
    let mut meta = BTreeMap::new();

    if let Ok(selector) = Selector::parse("meta[name][content]") {
        for element in document.select(&selector) {
            let name = element.value().attr("name").unwrap_or("");
            let content = element.value().attr("content").unwrap_or("");
            if !name.is_empty() && !content.is_empty() {
                meta.insert(name.to_string(), content.to_string());
            }
        }
    }

    meta
}

/// Extracts the document title with whitespace collapsed, empty if absent
pub fn extract_title(document: &Html) -> String {
    let Ok(selector) = Selector::parse("title") else {
        return String::new();
    };

    document
        .select(&selector)
        .next()
        .map(|element| {
            element
                .text()
                .collect::<String>()
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
        })
        .unwrap_or_default()
}

/// Normalized links from `<a href>` elements
pub fn extract_outlinks(document: &Html, base: Option<&Url>) -> Vec<String> {
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    normalize_candidates(link_candidates(document.select(&selector)), base)
}

/// Normalized links from non-anchor elements carrying `href` or `src`
pub fn extract_embeds(document: &Html, base: Option<&Url>) -> Vec<String> {
    let Ok(selector) = Selector::parse("[href], [src]") else {
        return Vec::new();
    };

    let elements = document
        .select(&selector)
        .filter(|element| element.value().name() != "a");
    normalize_candidates(link_candidates(elements), base)
}

/// Reads both `href` and `src` from every element into one candidate set
fn link_candidates<'a>(elements: impl Iterator<Item = ElementRef<'a>>) -> BTreeSet<&'a str> {
    let mut candidates = BTreeSet::new();
    for element in elements {
        for attr in ["href", "src"] {
            if let Some(value) = element.value().attr(attr) {
                candidates.insert(value);
            }
        }
    }
    candidates
}

fn normalize_candidates(candidates: BTreeSet<&str>, base: Option<&Url>) -> Vec<String> {
    let Some(base) = base else {
        return Vec::new();
    };

    candidates
        .into_iter()
        .filter_map(|raw| match resolve_link(raw, base) {
            Ok(url) => Some(url),
            Err(e) => {
                tracing::trace!("Dropping link {:?}: {}", raw, e);
                None
            }
        })
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
