//! URL handling module for Crawly Worker
//!
//! This module resolves link values found in fetched documents into absolute,
//! crawlable URLs. Resolution follows RFC 3986 via the `url` crate, with two
//! crawl-specific rules: protocol-relative references are forced to HTTPS and
//! only `http`/`https` results with a host are accepted. Values that are
//! already absolute are returned exactly as written.

mod normalize;

// Re-export main functions
pub use normalize::{normalize_link, resolve_link};
