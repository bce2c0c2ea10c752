//! Liveness endpoint

use axum::{http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use pictura_core::constants::SERVICE_NAME;

pub fn router() -> Router {
    Router::new().route("/health", get(health_check))
}

/// Process is up. Store and queue health show up in the worker logs instead.
pub async fn health_check() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "ok": true,
            "message": format!("{} is healthy", SERVICE_NAME),
        })),
    )
}
