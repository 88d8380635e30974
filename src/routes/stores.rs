//! Admin endpoints for the affiliate store registry

use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};

use crate::stores::{NewStore, StoreError, StoreRegistry, StoreUpdate};

pub fn routes(registry: Arc<StoreRegistry>) -> Router {
    Router::new()
        .route("/api/stores", get(list_stores).post(create_store))
        .route("/api/stores/active", get(list_active_stores))
        .route(
            "/api/stores/:id",
            get(get_store).put(update_store).delete(delete_store),
        )
        .route("/api/stores/:id/toggle", post(toggle_store))
        .layer(Extension(registry))
}

async fn list_stores(
    Extension(registry): Extension<Arc<StoreRegistry>>,
) -> Json<Value> {
    Json(json!({ "stores": registry.list() }))
}

async fn list_active_stores(
    Extension(registry): Extension<Arc<StoreRegistry>>,
) -> Json<Value> {
    Json(json!({ "stores": registry.active() }))
}

async fn get_store(
    Extension(registry): Extension<Arc<StoreRegistry>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    match registry.get_by_id(&id) {
        Some(store) => Ok(Json(json!({ "store": store }))),
        None => Err(error_response(StoreError::NotFound(id))),
    }
}

async fn create_store(
    Extension(registry): Extension<Arc<StoreRegistry>>,
    Json(payload): Json<NewStore>,
) -> Result<(StatusCode, Json<Value>), (StatusCode, Json<Value>)> {
    match registry.add(payload) {
        Ok(store) => Ok((StatusCode::CREATED, Json(json!({ "store": store })))),
        Err(err) => Err(error_response(err)),
    }
}

async fn update_store(
    Extension(registry): Extension<Arc<StoreRegistry>>,
    Path(id): Path<String>,
    Json(payload): Json<StoreUpdate>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    match registry.update(&id, payload) {
        Ok(store) => Ok(Json(json!({ "store": store }))),
        Err(err) => Err(error_response(err)),
    }
}

async fn toggle_store(
    Extension(registry): Extension<Arc<StoreRegistry>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    match registry.toggle(&id) {
        Ok(store) => Ok(Json(json!({ "store": store }))),
        Err(err) => Err(error_response(err)),
    }
}

async fn delete_store(
    Extension(registry): Extension<Arc<StoreRegistry>>,
    Path(id): Path<String>,
) -> Result<StatusCode, (StatusCode, Json<Value>)> {
    match registry.remove(&id) {
        Ok(()) => Ok(StatusCode::NO_CONTENT),
        Err(err) => Err(error_response(err)),
    }
}

fn error_response(err: StoreError) -> (StatusCode, Json<Value>) {
    let status = match err {
        StoreError::DuplicateName(_) => StatusCode::CONFLICT,
        StoreError::NotFound(_) => StatusCode::NOT_FOUND,
        StoreError::StorageFailure => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(json!({ "error": err.to_string() })))
}
