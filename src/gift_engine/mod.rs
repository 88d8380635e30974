//! Gift search engine
//!
//! This module provides the core scrape-and-rewrite pipeline: building the
//! search URL, fetching the source site's results page, extracting normalized
//! products from loosely structured HTML, and rewriting product links into
//! affiliate-tracked URLs.

pub mod affiliate;
pub mod extractor;
pub mod fetcher;
pub mod images;
pub mod normalizer;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Origin of the scraped site, used for resolving relative links and images.
pub const SOURCE_ORIGIN: &str = "https://www.magazineluiza.com.br";

/// Default search base when no affiliate store is selected.
pub const DEFAULT_SEARCH_BASE: &str = "https://www.magazineluiza.com.br";

/// Source tag stamped on every scraped product.
pub const AFFILIATE_SOURCE: &str = "magazine_luiza";

/// A normalized product listing scraped from the source site.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub external_id: String,
    pub affiliate_source: String,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub currency: String,
    pub category: String,
    pub image_url: String,
    pub product_url_base: String,
    #[serde(default)]
    pub affiliate_url: Option<String>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub review_count: Option<u32>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// A product wrapped for presentation in a suggestions list.
///
/// The relevance score is a positional placeholder, not a model output.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GiftSuggestion {
    pub id: String,
    pub gift_search_session_id: String,
    pub product: Product,
    pub relevance_score: f64,
    pub reason_text: String,
    pub position: usize,
}

/// Configuration for the gift engine.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    pub request_timeout_secs: u64,
    pub user_agent_rotation: bool,
    pub courtesy_delay: bool,
    pub delay_min_ms: u64,
    pub delay_max_ms: u64,
    pub search_base_url: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 25,
            user_agent_rotation: true,
            courtesy_delay: true,
            delay_min_ms: 2000,
            delay_max_ms: 5000,
            search_base_url: DEFAULT_SEARCH_BASE.to_string(),
        }
    }
}

/// Failure modes of a search, mapped to HTTP statuses at the route layer.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("acesso negado pelo site de origem")]
    Blocked,
    #[error("HTTP {0}")]
    UpstreamStatus(u16),
    #[error("falha na requisição: {0}")]
    Network(#[from] reqwest::Error),
}

/// The scrape-and-rewrite pipeline behind the search endpoint.
pub struct GiftEngine {
    config: EngineConfig,
    fetcher: fetcher::Fetcher,
}

impl GiftEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            fetcher: fetcher::Fetcher::new(config.clone()),
            config,
        }
    }

    /// One sequential fetch-then-parse pass. Zero extracted products is a
    /// valid empty result, not an error.
    pub async fn search(
        &self,
        query: &str,
        affiliate_base: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Product>, SearchError> {
        let url = fetcher::build_search_url(query, affiliate_base, &self.config.search_base_url);
        tracing::info!(%query, %url, "searching products");

        let html = self.fetcher.fetch(&url).await?;
        tracing::debug!(bytes = html.len(), "html received");

        let products = extractor::extract_products(&html, query, affiliate_base, limit);
        tracing::info!(count = products.len(), "products extracted");
        Ok(products)
    }

    /// Wraps products into suggestions with a descending positional score.
    pub fn suggestions(&self, query: &str, products: Vec<Product>) -> Vec<GiftSuggestion> {
        let session_id = format!("session_{}", Uuid::new_v4());
        products
            .into_iter()
            .enumerate()
            .map(|(index, product)| GiftSuggestion {
                id: format!("suggestion_{}", product.id),
                gift_search_session_id: session_id.clone(),
                relevance_score: ((0.9 - index as f64 * 0.01) * 100.0).round() / 100.0,
                reason_text: format!("Produto relacionado a \"{query}\""),
                position: index + 1,
                product,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_product(id: &str) -> Product {
        Product {
            id: id.to_string(),
            external_id: id.to_string(),
            affiliate_source: AFFILIATE_SOURCE.to_string(),
            name: "Caneca".to_string(),
            description: "Caneca térmica".to_string(),
            price: 49.90,
            currency: "BRL".to_string(),
            category: "Geral".to_string(),
            image_url: "https://img.example.com/caneca.jpg".to_string(),
            product_url_base: "https://www.magazineluiza.com.br/produto/1".to_string(),
            affiliate_url: None,
            rating: Some(4.5),
            review_count: Some(120),
            tags: vec!["Útil".to_string()],
        }
    }

    #[test]
    fn suggestions_score_descends_by_position() {
        let engine = GiftEngine::new(EngineConfig::default());
        let products = vec![sample_product("1"), sample_product("2"), sample_product("3")];
        let suggestions = engine.suggestions("caneca", products);

        assert_eq!(suggestions.len(), 3);
        assert_eq!(suggestions[0].relevance_score, 0.9);
        assert_eq!(suggestions[1].relevance_score, 0.89);
        assert_eq!(suggestions[2].relevance_score, 0.88);
        assert_eq!(suggestions[0].position, 1);
        assert_eq!(suggestions[2].position, 3);
        assert_eq!(suggestions[0].id, "suggestion_1");
        assert_eq!(
            suggestions[0].gift_search_session_id,
            suggestions[2].gift_search_session_id
        );
        assert!(suggestions[0].reason_text.contains("caneca"));
    }

    #[test]
    fn product_serializes_with_wire_field_names() {
        let json = serde_json::to_value(sample_product("1")).unwrap();
        assert!(json.get("externalId").is_some());
        assert!(json.get("affiliateSource").is_some());
        assert!(json.get("imageUrl").is_some());
        assert!(json.get("productUrlBase").is_some());
        assert!(json.get("reviewCount").is_some());
    }
}
