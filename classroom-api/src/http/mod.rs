// Module: http
// JSON REST API and WebSocket endpoint for the classroom apps

pub mod error;
pub mod health;
pub mod image;
pub mod session;
pub mod upload;
pub mod websocket;

use std::any::Any;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use classroom_core::config::{ServerConfig, UploadConfig};
use classroom_core::service::{ApiConfig, ApiConfigStore, ImageRelayClient, SessionStore};
use classroom_core::{Config, Error};
use classroom_relay::BroadcastRelay;
use serde_json::json;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

pub use error::{AppError, AppResult};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionStore>,
    pub api_config: Arc<ApiConfigStore>,
    pub image_client: ImageRelayClient,
    pub relay: BroadcastRelay,
    pub uploads: Arc<UploadConfig>,
    pub started_at: Instant,
}

impl AppState {
    /// Build every shared service once; creates the upload directory if missing
    pub fn new(config: &Config) -> classroom_core::Result<Self> {
        std::fs::create_dir_all(&config.uploads.dir)?;

        let sessions = Arc::new(SessionStore::new());
        let api_config = Arc::new(ApiConfigStore::new(ApiConfig::from(&config.image_api)));
        let image_client = ImageRelayClient::new(api_config.clone(), config.image_api.timeout())
            .map_err(|e| Error::Configuration(e.to_string()))?;
        let relay = BroadcastRelay::new(sessions.clone());

        Ok(Self {
            sessions,
            api_config,
            image_client,
            relay,
            uploads: Arc::new(config.uploads.clone()),
            started_at: Instant::now(),
        })
    }
}

/// Create the HTTP router with all routes
pub fn create_router(state: AppState, server: &ServerConfig) -> Router {
    let uploads_dir = ServeDir::new(&state.uploads.dir);
    let body_limit = state.uploads.max_body_bytes();
    let expose_panics = server.is_development();

    let router = Router::new()
        // Health check and service info
        .merge(health::create_health_router())
        // Session routes
        .route("/api/sessions", post(session::create_session))
        .route("/api/sessions/create", post(session::create_session))
        .route("/api/sessions/active", get(session::list_active_sessions))
        .route("/api/sessions/{session_id}", get(session::get_session))
        // Image routes
        .route("/api/images/edit", post(image::edit_image))
        .route(
            "/api/images/config",
            get(image::get_api_config).post(image::update_api_config),
        )
        // WebSocket endpoint for the teacher and whiteboard apps
        .route("/ws", get(websocket::websocket_handler))
        // Spooled uploads
        .nest_service("/uploads", uploads_dir)
        .fallback(not_found);

    // Apply layers before state
    let router = router
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CatchPanicLayer::custom(
            move |err: Box<dyn Any + Send + 'static>| panic_response(err, expose_panics),
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&server.cors_origins));

    // Apply state to all routes (must be last)
    router.with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(origin = %origin, error = %e, "Skipping invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

async fn not_found() -> AppError {
    AppError::not_found("Endpoint not found")
}

/// Turn a handler panic into a 500; the detail is only shown in development
fn panic_response(err: Box<dyn Any + Send + 'static>, expose: bool) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        (*s).to_string()
    } else {
        "Unknown panic".to_string()
    };

    error!(panic = %detail, "Request handler panicked");

    let message = if expose {
        detail
    } else {
        "Something went wrong".to_string()
    };

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "Internal server error", "message": message })),
    )
        .into_response()
}
