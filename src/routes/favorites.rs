//! Favorites endpoints

use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use serde_json::{json, Value};

use crate::favorites::FavoritesService;
use crate::gift_engine::Product;

pub fn routes(favorites: Arc<FavoritesService>) -> Router {
    Router::new()
        .route(
            "/api/favorites",
            get(list_favorites).post(add_favorite).delete(clear_favorites),
        )
        .route("/api/favorites/:id", axum::routing::delete(remove_favorite))
        .layer(Extension(favorites))
}

async fn list_favorites(
    Extension(favorites): Extension<Arc<FavoritesService>>,
) -> Json<Value> {
    Json(json!({ "favorites": favorites.list() }))
}

async fn add_favorite(
    Extension(favorites): Extension<Arc<FavoritesService>>,
    Json(product): Json<Product>,
) -> (StatusCode, Json<Value>) {
    if favorites.add(product) {
        (StatusCode::CREATED, Json(json!({ "added": true })))
    } else {
        (StatusCode::CONFLICT, Json(json!({ "added": false })))
    }
}

async fn remove_favorite(
    Extension(favorites): Extension<Arc<FavoritesService>>,
    Path(id): Path<String>,
) -> StatusCode {
    favorites.remove(&id);
    StatusCode::NO_CONTENT
}

async fn clear_favorites(
    Extension(favorites): Extension<Arc<FavoritesService>>,
) -> StatusCode {
    favorites.clear();
    StatusCode::NO_CONTENT
}
