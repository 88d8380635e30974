//! Image URL resolution with placeholder fallback

use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use url::Url;

use crate::gift_engine::SOURCE_ORIGIN;

const PLACEHOLDER_BASE: &str = "https://via.placeholder.com/400x400/8B5CF6/FFFFFF?text=";

fn placeholder_for(label: &str) -> String {
    let label = if label.trim().is_empty() { "Produto" } else { label };
    let short: String = label.chars().take(30).collect();
    format!(
        "{}{}",
        PLACEHOLDER_BASE,
        utf8_percent_encode(&short, NON_ALPHANUMERIC)
    )
}

/// Normalizes a scraped image reference into an absolute HTTPS URL.
///
/// Blank, `data:`-scheme and foreign-placeholder inputs fall back to a
/// generated placeholder that embeds the (length-capped) product label.
/// Protocol-relative and root-relative references are resolved against the
/// source site. The result always parses as an absolute URL.
pub fn resolve_image_url(raw: Option<&str>, label: &str) -> String {
    let url = match raw {
        Some(u) => u.trim(),
        None => return placeholder_for(label),
    };

    if url.is_empty() {
        return placeholder_for(label);
    }

    if url.starts_with("data:")
        || (url.contains("placeholder") && !url.contains("via.placeholder.com"))
    {
        return placeholder_for(label);
    }

    let absolute = if url.starts_with("http") {
        url.to_string()
    } else if url.starts_with("//") {
        format!("https:{url}")
    } else if url.starts_with('/') {
        format!("{SOURCE_ORIGIN}{url}")
    } else {
        format!("{SOURCE_ORIGIN}/{url}")
    };

    match Url::parse(&absolute) {
        Ok(_) => absolute,
        Err(_) => placeholder_for(label),
    }
}
