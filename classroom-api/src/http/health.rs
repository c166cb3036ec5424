//! Health check and service info endpoints

use axum::{extract::State, response::IntoResponse, routing::get, Json, Router};
use chrono::Utc;
use serde_json::json;

use crate::http::AppState;

/// Health check router
pub fn create_health_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/", get(service_info))
}

/// Liveness probe with process uptime in seconds
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "timestamp": Utc::now().to_rfc3339(),
        "uptime": state.started_at.elapsed().as_secs_f64(),
    }))
}

pub async fn service_info() -> impl IntoResponse {
    Json(json!({
        "name": "Classroom Interactive API",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
        "endpoints": {
            "health": "/health",
            "sessions": "/api/sessions",
            "images": "/api/images",
            "websocket": "/ws",
        },
    }))
}
