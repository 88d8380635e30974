//! HTML product extraction
//!
//! Parses a fetched search-results page into normalized products using three
//! ordered strategies, each tried only when the previous one produced zero
//! records: attribute-based product cards, embedded JSON-LD blocks, and
//! generic product-link anchors.

use chrono::Utc;
use lazy_static::lazy_static;
use rand::Rng;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;

use crate::gift_engine::affiliate::rewrite_affiliate_url;
use crate::gift_engine::images::resolve_image_url;
use crate::gift_engine::normalizer::{parse_price, tags_from_query, truncate_chars};
use crate::gift_engine::{Product, AFFILIATE_SOURCE, SOURCE_ORIGIN};

const MAX_NAME_CHARS: usize = 200;
const MAX_DESCRIPTION_CHARS: usize = 500;

fn sel(s: &str) -> Selector {
    Selector::parse(s).unwrap()
}

lazy_static! {
    static ref PRODUCT_CARD: Selector = sel("[data-product-id], [data-product], [data-product-name]");
    static ref INNER_PRODUCT_ID: Selector = sel("[data-product-id]");
    static ref CARD_NAME: Selector = sel("h2, h3, .product-title, [data-product-name]");
    static ref CARD_PRICE: Selector = sel(".price, .price-value, [data-price]");
    static ref PRICE_CLASS: Selector = sel("[class*=\"price\"]");
    static ref PRICE_CLASS_ANY_CASE: Selector = sel("[class*=\"price\"], [class*=\"Price\"]");
    static ref ANCHOR: Selector = sel("a");
    static ref IMG: Selector = sel("img");
    static ref IMG_DATA_SRC: Selector = sel("img[data-src]");
    static ref PICTURE_IMG: Selector = sel("picture img");
    static ref PICTURE_SOURCE: Selector = sel("picture source");
    static ref BG_IMAGE: Selector = sel("[style*=\"background-image\"]");
    static ref RATING: Selector = sel("[data-rating], .rating, .stars");
    static ref REVIEWS: Selector = sel(".reviews, [data-reviews]");
    static ref CATEGORY: Selector = sel("[data-category], .category");
    static ref DESCRIPTION: Selector = sel(".product-description, .description, p");
    static ref JSON_LD: Selector = sel("script[type=\"application/ld+json\"]");
    static ref PRODUCT_LINK: Selector = sel("a[href*=\"/produto/\"], a[href*=\"/p/\"]");
    static ref BG_URL_RE: Regex = Regex::new(r#"url\(['"]?([^'")]+)['"]?\)"#).unwrap();
    static ref PRODUCT_ID_RE: Regex = Regex::new(r"/produto/([^/]+)").unwrap();
    static ref SHORT_ID_RE: Regex = Regex::new(r"/p/([^/]+)").unwrap();
}

/// Extracts at most `limit` products from a search-results page.
pub fn extract_products(
    html: &str,
    query: &str,
    affiliate_base: Option<&str>,
    limit: usize,
) -> Vec<Product> {
    let document = Html::parse_document(html);

    let mut products = extract_from_cards(&document, query, affiliate_base, limit);
    if products.is_empty() {
        products = extract_from_json_ld(&document, query, affiliate_base);
    }
    if products.is_empty() {
        products = extract_from_anchors(&document, query, affiliate_base, limit);
    }

    products.truncate(limit);
    products
}

/// Strategy A: elements carrying product-identifying data attributes.
fn extract_from_cards(
    document: &Html,
    query: &str,
    affiliate_base: Option<&str>,
    limit: usize,
) -> Vec<Product> {
    let mut products = Vec::new();

    for (index, el) in document.select(&PRODUCT_CARD).enumerate() {
        if products.len() >= limit {
            break;
        }

        let id = own_attr(el, "data-product-id")
            .or_else(|| own_attr(el, "data-product"))
            .or_else(|| first_attr(el, &INNER_PRODUCT_ID, "data-product-id"))
            .unwrap_or_else(|| fallback_id(index));

        let placeholder = format!("Produto {}", index + 1);
        let name = first_text(el, &CARD_NAME)
            .or_else(|| own_attr(el, "data-product-name"))
            .or_else(|| first_attr(el, &ANCHOR, "title"))
            .unwrap_or_else(|| placeholder.clone());

        let price_text = first_text(el, &CARD_PRICE)
            .or_else(|| own_attr(el, "data-price"))
            .or_else(|| first_text(el, &PRICE_CLASS))
            .unwrap_or_default();
        let price = parse_price(&price_text);

        // Cards without a recognizable name or a positive price are noise.
        if name == placeholder || price <= 0.0 {
            continue;
        }

        let product_url = first_attr(el, &ANCHOR, "href")
            .or_else(|| own_attr(el, "href"))
            .unwrap_or_else(|| format!("{SOURCE_ORIGIN}/produto/{id}"));
        let full_url = absolutize(&product_url);
        let affiliate_url = apply_affiliate(affiliate_base, &full_url);

        let image = card_image(el);
        let image_url = resolve_image_url(image.as_deref(), &name);

        let description = first_text(el, &DESCRIPTION).unwrap_or_else(|| {
            format!("Produto {name} da Magazine Luiza. Perfeito para presentes especiais.")
        });

        let mut rng = rand::thread_rng();
        let rating = first_text(el, &RATING)
            .or_else(|| own_attr(el, "data-rating"))
            .and_then(|t| leading_f64(&t))
            .unwrap_or_else(|| rng.gen_range(4.0..5.0));
        let review_count = first_text(el, &REVIEWS)
            .or_else(|| own_attr(el, "data-reviews"))
            .and_then(|t| digits(&t))
            .unwrap_or_else(|| rng.gen_range(50..550));

        let category =
            first_text(el, &CATEGORY).unwrap_or_else(|| "Geral".to_string());

        products.push(Product {
            id: id.clone(),
            external_id: id,
            affiliate_source: AFFILIATE_SOURCE.to_string(),
            name: truncate_chars(&name, MAX_NAME_CHARS),
            description: truncate_chars(&description, MAX_DESCRIPTION_CHARS),
            price,
            currency: "BRL".to_string(),
            category,
            image_url,
            product_url_base: full_url,
            affiliate_url: Some(affiliate_url),
            rating: Some(round1(rating)),
            review_count: Some(review_count),
            tags: tags_from_query(query),
        });
    }

    products
}

/// Strategy B: embedded JSON-LD blocks declaring a Product.
fn extract_from_json_ld(
    document: &Html,
    query: &str,
    affiliate_base: Option<&str>,
) -> Vec<Product> {
    let mut products = Vec::new();

    for (index, el) in document.select(&JSON_LD).enumerate() {
        let raw = el.text().collect::<String>();
        let Ok(value) = serde_json::from_str::<Value>(&raw) else {
            continue;
        };

        let node = match &value {
            Value::Array(items) => match items.first() {
                Some(first) if first["@type"] == "Product" => first,
                _ => continue,
            },
            v if v["@type"] == "Product" => v,
            _ => continue,
        };

        let id = json_string(&node["sku"])
            .or_else(|| json_string(&node["productID"]))
            .unwrap_or_else(|| fallback_id(index));
        let name = json_string(&node["name"])
            .unwrap_or_else(|| format!("Produto {}", index + 1));
        let price = json_f64(&node["offers"]["price"])
            .or_else(|| json_f64(&node["price"]))
            .unwrap_or(0.0);

        let image = match &node["image"] {
            Value::String(s) => Some(s.clone()),
            Value::Array(items) => items
                .first()
                .and_then(|v| v.as_str())
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .or_else(|| {
                    items
                        .iter()
                        .filter_map(|v| v.as_str())
                        .find(|s| s.starts_with("http"))
                        .map(str::to_string)
                }),
            _ => None,
        };
        let image_url = resolve_image_url(image.as_deref(), &name);

        let description =
            json_string(&node["description"]).unwrap_or_else(|| format!("Produto {name}"));
        let rating = json_f64(&node["aggregateRating"]["ratingValue"]).unwrap_or(4.0);
        let review_count = json_f64(&node["aggregateRating"]["reviewCount"])
            .map(|v| v as u32)
            .unwrap_or(100);

        let product_url = json_string(&node["url"])
            .unwrap_or_else(|| format!("{SOURCE_ORIGIN}/produto/{id}"));
        let affiliate_url = apply_affiliate(affiliate_base, &product_url);

        let category =
            json_string(&node["category"]).unwrap_or_else(|| "Geral".to_string());

        products.push(Product {
            id: id.clone(),
            external_id: id,
            affiliate_source: AFFILIATE_SOURCE.to_string(),
            name: truncate_chars(&name, MAX_NAME_CHARS),
            description: truncate_chars(&description, MAX_DESCRIPTION_CHARS),
            price,
            currency: "BRL".to_string(),
            category,
            image_url,
            product_url_base: product_url,
            affiliate_url: Some(affiliate_url),
            rating: Some(round1(rating)),
            review_count: Some(review_count),
            tags: tags_from_query(query),
        });
    }

    products
}

/// Strategy C: generic product-link anchors.
fn extract_from_anchors(
    document: &Html,
    query: &str,
    affiliate_base: Option<&str>,
    limit: usize,
) -> Vec<Product> {
    let mut products = Vec::new();

    for (index, el) in document.select(&PRODUCT_LINK).enumerate() {
        if products.len() >= limit {
            break;
        }

        let Some(href) = el.value().attr("href") else {
            continue;
        };

        let placeholder = format!("Produto {}", index + 1);
        let name = first_attr(el, &IMG, "alt")
            .or_else(|| {
                let text = el.text().collect::<String>().trim().to_string();
                if text.is_empty() {
                    None
                } else {
                    Some(text)
                }
            })
            .unwrap_or_else(|| placeholder.clone());
        if name == placeholder {
            continue;
        }

        let id = PRODUCT_ID_RE
            .captures(href)
            .or_else(|| SHORT_ID_RE.captures(href))
            .map(|c| c[1].to_string())
            .unwrap_or_else(|| fallback_id(index));

        let full_url = absolutize(href);
        let affiliate_url = apply_affiliate(affiliate_base, &full_url);

        let image = first_attr(el, &IMG, "data-src")
            .or_else(|| first_attr(el, &IMG, "src"))
            .or_else(|| {
                closest_container(el).and_then(|c| {
                    first_attr(c, &IMG, "data-src").or_else(|| first_attr(c, &IMG, "src"))
                })
            });
        let image_url = resolve_image_url(image.as_deref(), &name);

        let mut rng = rand::thread_rng();
        let price_text = closest_container(el)
            .and_then(|c| first_text(c, &PRICE_CLASS_ANY_CASE))
            .unwrap_or_default();
        let parsed = parse_price(&price_text);
        let price = if parsed > 0.0 {
            parsed
        } else {
            rng.gen_range(50.0..550.0)
        };

        products.push(Product {
            id: id.clone(),
            external_id: id,
            affiliate_source: AFFILIATE_SOURCE.to_string(),
            name: truncate_chars(&name, MAX_NAME_CHARS),
            description: truncate_chars(
                &format!("Produto {name} da Magazine Luiza"),
                MAX_DESCRIPTION_CHARS,
            ),
            price,
            currency: "BRL".to_string(),
            category: "Geral".to_string(),
            image_url,
            product_url_base: full_url,
            affiliate_url: Some(affiliate_url),
            rating: Some(round1(rng.gen_range(4.0..5.0))),
            review_count: Some(rng.gen_range(50..550)),
            tags: tags_from_query(query),
        });
    }

    products
}

fn own_attr(el: ElementRef, name: &str) -> Option<String> {
    el.value()
        .attr(name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn first_attr(el: ElementRef, selector: &Selector, name: &str) -> Option<String> {
    let found = el.select(selector).next()?;
    found
        .value()
        .attr(name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn first_text(el: ElementRef, selector: &Selector) -> Option<String> {
    let found = el.select(selector).next()?;
    let text = found.text().collect::<String>().trim().to_string();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Nearest enclosing `div`, `li` or `article`, including the element itself.
fn closest_container(el: ElementRef) -> Option<ElementRef> {
    if matches!(el.value().name(), "div" | "li" | "article") {
        return Some(el);
    }
    for node in el.ancestors() {
        if let Some(ancestor) = ElementRef::wrap(node) {
            if matches!(ancestor.value().name(), "div" | "li" | "article") {
                return Some(ancestor);
            }
        }
    }
    None
}

/// Ordered image probes for an attribute-based product card.
fn card_image(el: ElementRef) -> Option<String> {
    first_attr(el, &IMG, "data-src")
        .or_else(|| first_attr(el, &IMG_DATA_SRC, "data-src"))
        .or_else(|| first_attr(el, &IMG, "src"))
        .or_else(|| first_attr(el, &PICTURE_IMG, "src"))
        .or_else(|| {
            first_attr(el, &PICTURE_SOURCE, "srcset")
                .and_then(|srcset| srcset.split_whitespace().next().map(str::to_string))
        })
        .or_else(|| {
            first_attr(el, &BG_IMAGE, "style")
                .and_then(|style| BG_URL_RE.captures(&style).map(|c| c[1].to_string()))
        })
        .or_else(|| {
            closest_container(el).and_then(|c| {
                first_attr(c, &IMG, "data-src").or_else(|| first_attr(c, &IMG, "src"))
            })
        })
}

fn absolutize(url: &str) -> String {
    if url.starts_with("http") {
        url.to_string()
    } else {
        format!("{SOURCE_ORIGIN}{url}")
    }
}

fn apply_affiliate(affiliate_base: Option<&str>, full_url: &str) -> String {
    match affiliate_base {
        Some(base) => rewrite_affiliate_url(base, full_url),
        None => full_url.to_string(),
    }
}

fn fallback_id(index: usize) -> String {
    format!("ml_{}_{}", Utc::now().timestamp_millis(), index)
}

fn json_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn json_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Leading numeric portion of a rating string; commas count as decimal points.
fn leading_f64(text: &str) -> Option<f64> {
    let normalized = text.replace(',', ".");
    let numeric: String = normalized
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    numeric.parse().ok()
}

fn digits(text: &str) -> Option<u32> {
    let numeric: String = text.chars().filter(|c| c.is_ascii_digit()).collect();
    numeric.parse().ok()
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    const CARD_PAGE: &str = r#"
        <html><body>
        <div data-product-id="123" data-price="R$ 1.234,56">
            <h3>Caneca Térmica</h3>
            <a href="/produto/123" title="Caneca Térmica">ver</a>
            <img data-src="//img.magazineluiza.com.br/caneca.jpg">
        </div>
        <div data-product-id="456" data-price="R$ 99,90">
            <h3>Fone Bluetooth</h3>
            <a href="/produto/456">ver</a>
            <img src="/img/fone.jpg">
        </div>
        </body></html>
    "#;

    #[test]
    fn cards_are_extracted_in_document_order() {
        let products = extract_products(CARD_PAGE, "caneca", None, 10);
        assert_eq!(products.len(), 2);
        assert_eq!(products[0].id, "123");
        assert_eq!(products[0].name, "Caneca Térmica");
        assert_eq!(products[0].price, 1234.56);
        assert_eq!(products[0].currency, "BRL");
        assert_eq!(
            products[0].image_url,
            "https://img.magazineluiza.com.br/caneca.jpg"
        );
        assert_eq!(
            products[0].product_url_base,
            "https://www.magazineluiza.com.br/produto/123"
        );
        assert_eq!(products[1].id, "456");
    }

    #[test]
    fn limit_bounds_the_result() {
        assert_eq!(extract_products(CARD_PAGE, "q", None, 0).len(), 0);
        let one = extract_products(CARD_PAGE, "q", None, 1);
        assert_eq!(one.len(), 1);
        assert_eq!(one[0].id, "123");
    }

    #[test]
    fn affiliate_base_rewrites_product_links() {
        let products = extract_products(
            CARD_PAGE,
            "caneca",
            Some("https://www.magazinevoce.com.br/elislecio"),
            10,
        );
        assert_eq!(
            products[0].affiliate_url.as_deref(),
            Some("https://www.magazinevoce.com.br/elislecio/produto/123")
        );
    }

    #[test]
    fn cards_without_a_real_name_are_rejected() {
        let html = r#"<div data-product-id="9" data-price="R$ 10,00"><span>sem nome</span></div>"#;
        assert!(extract_products(html, "q", None, 10).is_empty());
    }

    #[test]
    fn cards_without_a_positive_price_are_rejected() {
        let html = r#"<div data-product-id="9"><h3>Produto Real</h3><a href="/item/9">ver</a></div>"#;
        assert!(extract_products(html, "q", None, 10).is_empty());
    }

    #[test]
    fn json_ld_block_is_used_when_no_cards_match() {
        let html = r#"
            <html><body>
            <script type="application/ld+json">
            {"@type":"Product","sku":"SKU9","name":"Kit Presente",
             "offers":{"price":"199.90"},
             "image":["https://img.example.com/kit.jpg"],
             "aggregateRating":{"ratingValue":4.7,"reviewCount":321},
             "url":"https://www.magazineluiza.com.br/produto/SKU9"}
            </script>
            </body></html>
        "#;
        let products = extract_products(html, "presente tech", None, 10);
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].id, "SKU9");
        assert_eq!(products[0].name, "Kit Presente");
        assert_eq!(products[0].price, 199.90);
        assert_eq!(products[0].rating, Some(4.7));
        assert_eq!(products[0].review_count, Some(321));
        assert_eq!(products[0].image_url, "https://img.example.com/kit.jpg");
        assert_eq!(products[0].tags, vec!["Tecnológico"]);
    }

    #[test]
    fn json_ld_accepts_zero_price() {
        let html = r#"
            <script type="application/ld+json">
            {"@type":"Product","sku":"S1","name":"Sem Preço"}
            </script>
        "#;
        let products = extract_products(html, "q", None, 10);
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].price, 0.0);
    }

    #[test]
    fn non_product_json_ld_is_skipped() {
        let html = r#"
            <script type="application/ld+json">
            {"@type":"BreadcrumbList","name":"navegação"}
            </script>
        "#;
        assert!(extract_products(html, "q", None, 10).is_empty());
    }

    #[test]
    fn anchors_are_the_last_resort() {
        let html = r#"
            <ul><li>
                <a href="/produto/abc123"><img alt="Fone Bluetooth" src="/img/fone.jpg"></a>
                <span class="price">R$ 99,90</span>
            </li></ul>
        "#;
        let products = extract_products(html, "fone", None, 10);
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].id, "abc123");
        assert_eq!(products[0].name, "Fone Bluetooth");
        assert_eq!(products[0].price, 99.90);
        assert_eq!(
            products[0].product_url_base,
            "https://www.magazineluiza.com.br/produto/abc123"
        );
    }

    #[test]
    fn anchors_without_alt_or_text_are_skipped() {
        let html = r#"<a href="/produto/abc123"><img src="/img/x.jpg"></a>"#;
        assert!(extract_products(html, "q", None, 10).is_empty());
    }

    #[test]
    fn anchor_price_falls_back_to_randomized_value() {
        let html = r#"<li><a href="/p/777">Luminária de Mesa</a></li>"#;
        let products = extract_products(html, "q", None, 10);
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].id, "777");
        let price = products[0].price;
        assert!((50.0..550.0).contains(&price));
    }

    #[test]
    fn long_names_are_truncated_to_200_chars() {
        let long_name = "á".repeat(300);
        let html = format!(
            r#"<div data-product-id="1" data-price="10,00"><h3>{long_name}</h3><a href="/item/1">ver</a></div>"#
        );
        let products = extract_products(&html, "q", None, 10);
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].name.chars().count(), 200);
    }

    #[test]
    fn missing_rating_gets_a_bounded_fallback() {
        let products = extract_products(CARD_PAGE, "q", None, 10);
        let rating = products[0].rating.unwrap();
        assert!((4.0..=5.0).contains(&rating));
        let reviews = products[0].review_count.unwrap();
        assert!((50..550).contains(&reviews));
    }
}
