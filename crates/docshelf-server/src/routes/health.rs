//! Liveness probe and other unauthenticated plumbing.

use std::sync::Arc;

use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value, json};

use crate::state::AppState;

/// Build the health router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health))
        .route("/favicon.ico", get(favicon))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Keeps browsers' automatic favicon requests away from the document route.
async fn favicon() -> StatusCode {
    StatusCode::NO_CONTENT
}
