use crate::UrlError;
use url::{ParseError, Url};

/// Resolves a raw `href`/`src` attribute value against the page it was found on
///
/// # Resolution Rules
///
/// 1. Empty values and fragment-only references (`#...`) are rejected
/// 2. Protocol-relative references (`//host/path`) are forced to `https:`
/// 3. Root-relative references (`/path`) replace the base path, keeping its origin
/// 4. Explicitly relative references (`./path`) resolve against the base directory
/// 5. Anything else is parsed as an absolute URL, falling back to RFC 3986
///    resolution against the full base URL when it has no scheme
///
/// Results must be `http`/`https` with a non-empty host. A valid absolute
/// value is returned exactly as written (minus surrounding whitespace); only
/// values resolved against the base come back in canonical form.
///
/// # Arguments
///
/// * `raw` - The attribute value as found in the document
/// * `base` - The URL of the page the value was found on
///
/// # Returns
///
/// * `Ok(String)` - The absolute URL
/// * `Err(UrlError)` - The value cannot be turned into a crawlable URL
///
/// # Examples
///
/// ```
/// use crawly_worker::url::normalize_link;
///
/// let url = normalize_link("./img.png", "https://x.com/p/q/page.html").unwrap();
/// assert_eq!(url, "https://x.com/p/q/img.png");
/// ```
pub fn normalize_link(raw: &str, base: &str) -> Result<String, UrlError> {
    let base = Url::parse(base).map_err(|e| UrlError::Parse(e.to_string()))?;
    resolve_link(raw, &base)
}

/// Same as [`normalize_link`] with an already parsed base URL
///
/// Link extraction resolves many values against one page, so the base is
/// parsed once by the caller.
pub fn resolve_link(raw: &str, base: &Url) -> Result<String, UrlError> {
    let raw = raw.trim();

    if raw.is_empty() {
        return Err(UrlError::Empty);
    }

    if raw.starts_with('#') {
        return Err(UrlError::FragmentOnly(raw.to_string()));
    }

    let resolved = if raw.starts_with("//") {
        Url::parse(&format!("https:{}", raw)).map_err(|e| UrlError::Parse(e.to_string()))?
    } else if raw.starts_with('/') || raw.starts_with("./") {
        // Both resolve relative to the base per RFC 3986: a leading slash keeps
        // only the origin, a leading dot segment keeps the base directory.
        join(base, raw)?
    } else {
        match Url::parse(raw) {
            Ok(url) => {
                // Absolute values are kept exactly as written
                check_crawlable(&url)?;
                return Ok(raw.to_string());
            }
            Err(ParseError::RelativeUrlWithoutBase) => join(base, raw)?,
            Err(e) => return Err(UrlError::Parse(e.to_string())),
        }
    };

    check_crawlable(&resolved)?;
    Ok(resolved.into())
}

fn join(base: &Url, raw: &str) -> Result<Url, UrlError> {
    base.join(raw).map_err(|e| UrlError::Parse(e.to_string()))
}

/// Rejects URLs a fetcher cannot visit
fn check_crawlable(url: &Url) -> Result<(), UrlError> {
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    match url.host_str() {
        Some(host) if !host.is_empty() => Ok(()),
        _ => Err(UrlError::MissingHost),
    }
}
