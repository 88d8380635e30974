//! Affiliate link rewriting
//!
//! Turns a raw product URL into the outbound affiliate-tracked URL for a
//! store's base-URL template. The matching is purely lexical and
//! case-sensitive; no network validation is performed.

use lazy_static::lazy_static;
use regex::Regex;
use url::Url;

lazy_static! {
    static ref HOST_PATH_RE: Regex = Regex::new(r"https?://[^/]+(/.*)").unwrap();
}

/// Rewrites `product_url` onto the affiliate `template`.
///
/// Templates containing the literal `{productUrl}` token get a verbatim
/// substitution. Otherwise the template is treated as a base URL whose path
/// prefix must not reappear in the final path: leading copies of the template
/// itself, the template path, and the template path's final segment are all
/// stripped from the product URL before the two halves are joined. Templates
/// ending in `?` or `&` are query-building prefixes and are concatenated
/// without slash normalization.
pub fn rewrite_affiliate_url(template: &str, product_url: &str) -> String {
    if template.contains("{productUrl}") {
        return template.replacen("{productUrl}", product_url, 1);
    }

    let trimmed = template.trim();

    // Source URLs sometimes arrive already affiliate-prefixed, possibly more
    // than once. Strip every leading copy of the template.
    let mut path = product_url.to_string();
    if !trimmed.is_empty() {
        while path.starts_with(trimmed) {
            path = path[trimmed.len()..].to_string();
        }
    }

    // Reduce what remains to path + query if it is still an absolute URL.
    if path.starts_with("http://") || path.starts_with("https://") {
        match Url::parse(&path) {
            Ok(parsed) => {
                path = match parsed.query() {
                    Some(q) => format!("{}?{}", parsed.path(), q),
                    None => parsed.path().to_string(),
                };
            }
            Err(_) => {
                let snapshot = path.clone();
                if let Some(caps) = HOST_PATH_RE.captures(&snapshot) {
                    path = caps[1].to_string();
                }
            }
        }
    }

    // Strip the template path and repeated copies of its final segment (the
    // affiliate tag) from the front of the relative path. An unparseable
    // template, or one whose path is empty or "/", skips this step.
    if let Ok(template_url) = Url::parse(trimmed) {
        let template_path = template_url.path().to_string();
        if !template_path.is_empty() && template_path != "/" {
            if path.starts_with(template_path.as_str()) {
                path = path[template_path.len()..].to_string();
            }
            if let Some(segment) = template_path.split('/').filter(|s| !s.is_empty()).last() {
                let bare = format!("{segment}/");
                let slashed = format!("/{segment}/");
                loop {
                    if let Some(rest) = path.strip_prefix(&slashed) {
                        path = format!("/{rest}");
                    } else if let Some(rest) = path.strip_prefix(&bare) {
                        path = format!("/{rest}");
                    } else {
                        break;
                    }
                }
            }
        }
    }

    // Collapse repeated slashes and guarantee a single leading one.
    let mut relative = String::with_capacity(path.len() + 1);
    let mut prev_slash = false;
    for c in path.chars() {
        if c == '/' {
            if prev_slash {
                continue;
            }
            prev_slash = true;
        } else {
            prev_slash = false;
        }
        relative.push(c);
    }
    if !relative.starts_with('/') {
        relative.insert(0, '/');
    }

    // Query-building prefixes are concatenated verbatim.
    if template.ends_with('?') || template.ends_with('&') {
        return format!("{template}{relative}");
    }

    let base = trimmed.strip_suffix('/').unwrap_or(trimmed);
    format!("{base}{relative}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_product_url_token() {
        assert_eq!(
            rewrite_affiliate_url(
                "https://amazon.com.br/redirect?url={productUrl}",
                "https://amazon.com.br/dp/B01"
            ),
            "https://amazon.com.br/redirect?url=https://amazon.com.br/dp/B01"
        );
    }

    #[test]
    fn affiliate_tag_appears_exactly_once() {
        let template = "https://aff.example.com/tag1";
        let rewritten =
            rewrite_affiliate_url(template, "https://aff.example.com/tag1/produto/abc");
        assert_eq!(rewritten, "https://aff.example.com/tag1/produto/abc");
        assert_eq!(rewritten.matches("tag1").count(), 1);
    }

    #[test]
    fn strips_every_leading_template_repetition() {
        let template = "https://aff.example.com/tag1";
        let doubled = format!("{template}{template}/produto/abc");
        assert_eq!(
            rewrite_affiliate_url(template, &doubled),
            "https://aff.example.com/tag1/produto/abc"
        );
        let tripled = format!("{template}{template}{template}/produto/abc");
        assert_eq!(
            rewrite_affiliate_url(template, &tripled),
            "https://aff.example.com/tag1/produto/abc"
        );
    }

    #[test]
    fn strips_repeated_affiliate_segment_from_path() {
        assert_eq!(
            rewrite_affiliate_url(
                "https://www.magazinevoce.com.br/elislecio",
                "https://www.magazinevoce.com.br/elislecio/elislecio/produto/123"
            ),
            "https://www.magazinevoce.com.br/elislecio/produto/123"
        );
    }

    #[test]
    fn query_prefix_template_concatenates_verbatim() {
        assert_eq!(
            rewrite_affiliate_url("https://store.com/x?a=1&", "https://store.com/x/p/1"),
            "https://store.com/x?a=1&/p/1"
        );
        assert_eq!(
            rewrite_affiliate_url("https://store.com/go?", "https://other.com/p/1"),
            "https://store.com/go?/p/1"
        );
    }

    #[test]
    fn reduces_foreign_absolute_urls_to_their_path() {
        assert_eq!(
            rewrite_affiliate_url(
                "https://aff.example.com/tag1",
                "https://www.magazineluiza.com.br/produto/abc?cor=azul"
            ),
            "https://aff.example.com/tag1/produto/abc?cor=azul"
        );
    }

    #[test]
    fn trailing_slash_template_joins_cleanly() {
        assert_eq!(
            rewrite_affiliate_url("https://aff.example.com/tag1/", "/produto/abc"),
            "https://aff.example.com/tag1/produto/abc"
        );
    }

    #[test]
    fn root_path_template_is_a_no_op_for_segment_stripping() {
        assert_eq!(
            rewrite_affiliate_url("https://aff.example.com", "/produto/abc"),
            "https://aff.example.com/produto/abc"
        );
    }

    #[test]
    fn unparseable_template_still_concatenates() {
        assert_eq!(
            rewrite_affiliate_url("not a url", "/produto/abc"),
            "not a url/produto/abc"
        );
    }

    #[test]
    fn rewriting_twice_is_stable_for_clean_inputs() {
        let template = "https://aff.example.com/tag1";
        let once = rewrite_affiliate_url(template, "https://aff.example.com/tag1/produto/abc");
        let twice = rewrite_affiliate_url(template, &once);
        assert_eq!(once, twice);
    }
}
