mod favorites;
mod gift_engine;
mod routes;
mod storage;
mod stores;

use std::sync::Arc;

use axum::{routing::get, Json, Router};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tracing_subscriber::EnvFilter;

use favorites::FavoritesService;
use gift_engine::{EngineConfig, GiftEngine};
use storage::{FileStorage, KeyValueStorage, MemoryStorage};
use stores::StoreRegistry;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let storage: Arc<dyn KeyValueStorage> = match std::env::var("WISHBOX_DATA_DIR") {
        Ok(dir) => {
            tracing::info!(%dir, "using file storage");
            Arc::new(FileStorage::new(dir))
        }
        Err(_) => Arc::new(MemoryStorage::new()),
    };

    let engine = Arc::new(GiftEngine::new(EngineConfig::default()));
    let registry = Arc::new(StoreRegistry::new(storage.clone()));
    let favorites = Arc::new(FavoritesService::new(storage));

    let app = Router::new()
        .route("/health", get(health))
        .merge(routes::search::routes(engine, registry.clone()))
        .merge(routes::stores::routes(registry))
        .merge(routes::favorites::routes(favorites))
        .layer(CorsLayer::permissive());

    let port = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(3000);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
        .await
        .expect("failed to bind server port");
    tracing::info!(port, "gift service listening");
    axum::serve(listener, app).await.expect("server error");
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "gift-service",
        "features": ["search", "suggestions", "stores", "favorites"]
    }))
}
