// HTTP error handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use classroom_core::service::ImageRelayError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Result type for HTTP handlers
pub type AppResult<T> = Result<T, AppError>;

/// Application error with HTTP status code
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn payload_too_large(message: impl Into<String>) -> Self {
        Self::new(StatusCode::PAYLOAD_TOO_LARGE, message)
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.status, self.message)
    }
}

impl std::error::Error for AppError {}

/// Error response JSON structure
#[derive(Debug, Serialize, Deserialize)]
struct ErrorResponse {
    error: String,
    status: u16,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status;
        let body = Json(ErrorResponse {
            error: self.message,
            status: status.as_u16(),
        });

        (status, body).into_response()
    }
}

/// Convert classroom_core errors to HTTP errors
impl From<classroom_core::Error> for AppError {
    fn from(err: classroom_core::Error) -> Self {
        use classroom_core::Error;

        match err {
            Error::NotFound(msg) => Self::not_found(msg),
            Error::InvalidInput(msg) => Self::bad_request(msg),
            Error::Configuration(msg) => {
                tracing::error!("Configuration error: {}", msg);
                Self::internal_server_error(msg)
            }
            Error::Io(e) => {
                tracing::error!("I/O error: {}", e);
                Self::internal_server_error("File processing error")
            }
        }
    }
}

/// Upstream failures surface their readable message as a 500
impl From<ImageRelayError> for AppError {
    fn from(err: ImageRelayError) -> Self {
        Self::internal_server_error(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_errors_map_to_status() {
        let err: AppError = classroom_core::Error::NotFound("Session not found".into()).into();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
        assert_eq!(err.message, "Session not found");

        let err: AppError = classroom_core::Error::InvalidInput("Prompt is required".into()).into();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.message, "Prompt is required");

        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "/srv/uploads");
        let err: AppError = classroom_core::Error::Io(io).into();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message, "File processing error");
    }

    #[test]
    fn test_relay_errors_keep_their_message() {
        let err: AppError = ImageRelayError::Timeout.into();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.message.starts_with("Request timed out"));
    }
}
