//! HTML parsing for anchor discovery
//!
//! The primary page is read back as HTML and matched against the configured
//! anchor selector here, so the browser only has to hand over markup.

use super::BrowserError;
use scraper::{Html, Selector};
use url::Url;

/// Extracts the absolute addresses of all anchors matching `selector`
///
/// # Link Extraction Rules
///
/// - Only elements with an `href` are considered
/// - Relative links are resolved against `base_url`
/// - `javascript:`, `mailto:`, `tel:`, `data:` and fragment-only links are skipped
/// - Duplicates are kept in document order; deduplication is the caller's job
///
/// # Arguments
///
/// * `html` - The page markup
/// * `base_url` - The page address, for resolving relative links
/// * `selector` - A CSS selector such as `a[href*='/explore/']`
///
/// # Returns
///
/// * `Ok(Vec<String>)` - The resolved addresses
/// * `Err(BrowserError::Selector)` - The selector does not parse
///
/// # Example
///
/// ```
/// use note_harvester::browser::extract_anchors;
/// use url::Url;
///
/// let html = r#"<a href="/explore/1">one</a><a href="/user/2">two</a>"#;
/// let base = Url::parse("https://www.example.com/user/profile/9").unwrap();
/// let anchors = extract_anchors(html, &base, "a[href*='/explore/']").unwrap();
/// assert_eq!(anchors, vec!["https://www.example.com/explore/1"]);
/// ```
pub fn extract_anchors(
    html: &str,
    base_url: &Url,
    selector: &str,
) -> Result<Vec<String>, BrowserError> {
    let selector =
        Selector::parse(selector).map_err(|_| BrowserError::Selector(selector.to_string()))?;
    let document = Html::parse_document(html);

    Ok(document
        .select(&selector)
        .filter_map(|element| element.value().attr("href"))
        .filter_map(|href| resolve_link(href, base_url))
        .collect())
}

/// Resolves a link href to an absolute http(s) address
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    match base_url.join(href) {
        Ok(absolute_url) if matches!(absolute_url.scheme(), "http" | "https") => {
            Some(absolute_url.to_string())
        }
        _ => None,
    }
}
