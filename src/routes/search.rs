//! Search and suggestions endpoints

use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};

use crate::gift_engine::{GiftEngine, GiftSuggestion, Product, SearchError};
use crate::stores::StoreRegistry;

const DEFAULT_LIMIT: usize = 20;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub query: Option<String>,
    pub limit: Option<usize>,
    #[serde(rename = "affiliateUrl")]
    pub affiliate_url: Option<String>,
    /// Affiliate store name; resolved against the registry when no explicit
    /// affiliateUrl is given. Only active stores are considered.
    pub store: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub success: bool,
    pub query: String,
    #[serde(rename = "affiliateUrl")]
    pub affiliate_url: Option<String>,
    pub products: Vec<Product>,
    pub count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SuggestionsResponse {
    pub success: bool,
    pub query: String,
    pub suggestions: Vec<GiftSuggestion>,
    pub count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

pub fn routes(engine: Arc<GiftEngine>, registry: Arc<StoreRegistry>) -> Router {
    Router::new()
        .route("/api/search", get(search))
        .route("/api/suggestions", get(suggestions))
        .layer(Extension(engine))
        .layer(Extension(registry))
}

/// An explicit affiliateUrl wins; otherwise a named, active store from the
/// registry supplies its template.
fn resolve_affiliate(registry: &StoreRegistry, params: &SearchQuery) -> Option<String> {
    params.affiliate_url.clone().or_else(|| {
        params.store.as_deref().and_then(|name| {
            registry
                .get_by_name(name)
                .filter(|s| s.is_active)
                .map(|s| s.affiliate_url_template)
        })
    })
}

async fn search(
    Extension(engine): Extension<Arc<GiftEngine>>,
    Extension(registry): Extension<Arc<StoreRegistry>>,
    Query(params): Query<SearchQuery>,
) -> (StatusCode, Json<SearchResponse>) {
    let query = params.query.clone().unwrap_or_default();
    let affiliate_url = resolve_affiliate(&registry, &params);
    if query.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(SearchResponse {
                success: false,
                query,
                affiliate_url,
                products: Vec::new(),
                count: 0,
                error: Some("Query parameter is required".to_string()),
                details: None,
            }),
        );
    }

    let limit = params.limit.unwrap_or(DEFAULT_LIMIT);
    match engine.search(&query, affiliate_url.as_deref(), limit).await {
        Ok(products) => {
            let count = products.len();
            (
                StatusCode::OK,
                Json(SearchResponse {
                    success: true,
                    query,
                    affiliate_url,
                    products,
                    count,
                    error: None,
                    details: None,
                }),
            )
        }
        Err(err) => {
            tracing::error!(%query, %err, "search failed");
            let (status, error, details) = classify(&err);
            (
                status,
                Json(SearchResponse {
                    success: false,
                    query,
                    affiliate_url,
                    products: Vec::new(),
                    count: 0,
                    error: Some(error),
                    details: Some(details),
                }),
            )
        }
    }
}

async fn suggestions(
    Extension(engine): Extension<Arc<GiftEngine>>,
    Extension(registry): Extension<Arc<StoreRegistry>>,
    Query(params): Query<SearchQuery>,
) -> (StatusCode, Json<SuggestionsResponse>) {
    let query = params.query.clone().unwrap_or_default();
    let affiliate_url = resolve_affiliate(&registry, &params);
    if query.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(SuggestionsResponse {
                success: false,
                query,
                suggestions: Vec::new(),
                count: 0,
                error: Some("Query parameter is required".to_string()),
                details: None,
            }),
        );
    }

    let limit = params.limit.unwrap_or(DEFAULT_LIMIT);
    match engine.search(&query, affiliate_url.as_deref(), limit).await {
        Ok(products) => {
            let suggestions = engine.suggestions(&query, products);
            let count = suggestions.len();
            (
                StatusCode::OK,
                Json(SuggestionsResponse {
                    success: true,
                    query,
                    suggestions,
                    count,
                    error: None,
                    details: None,
                }),
            )
        }
        Err(err) => {
            tracing::error!(%query, %err, "suggestions failed");
            let (status, error, details) = classify(&err);
            (
                status,
                Json(SuggestionsResponse {
                    success: false,
                    query,
                    suggestions: Vec::new(),
                    count: 0,
                    error: Some(error),
                    details: Some(details),
                }),
            )
        }
    }
}

/// Maps an engine failure onto a status and the human-readable wire fields.
fn classify(err: &SearchError) -> (StatusCode, String, String) {
    match err {
        SearchError::Blocked => (
            StatusCode::FORBIDDEN,
            "Acesso negado pelo site. O site pode estar bloqueando requisições automatizadas."
                .to_string(),
            "O site de origem pode estar bloqueando requisições que não vêm de navegadores reais."
                .to_string(),
        ),
        SearchError::UpstreamStatus(status) => (
            StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY),
            format!("HTTP {status}"),
            "Erro ao acessar o site".to_string(),
        ),
        SearchError::Network(inner) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            inner.to_string(),
            "Erro desconhecido".to_string(),
        ),
    }
}
