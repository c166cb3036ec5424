//! Image relay error types
//!
//! Display strings are what the teacher UI shows and what goes out in
//! `generation_error` broadcasts.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImageRelayError {
    #[error("API configuration incomplete: set the API base URL and API key")]
    Configuration,

    #[error("Request timed out: the API server took too long to respond, please try again later")]
    Timeout,

    #[error("Network connection failed: unable to reach the API server, check the network and the API base URL")]
    Network(String),

    #[error("API error ({status}): {message}")]
    Upstream { status: u16, message: String },

    #[error("Network error: {0}")]
    Unknown(String),
}

impl ImageRelayError {
    /// Short machine-readable classification, used in logs
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Configuration => "configuration",
            Self::Timeout => "timeout",
            Self::Network(_) => "network",
            Self::Upstream { .. } => "upstream",
            Self::Unknown(_) => "unknown",
        }
    }

    /// Build an upstream error from a non-2xx status and its raw body
    ///
    /// The message is `error.message` from a JSON body, falling back to the
    /// status reason phrase.
    #[must_use]
    pub fn from_upstream(status: reqwest::StatusCode, body: &str) -> Self {
        let message = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|v| {
                v.pointer("/error/message")
                    .and_then(|m| m.as_str())
                    .map(str::to_string)
            })
            .filter(|m| !m.is_empty())
            .or_else(|| status.canonical_reason().map(str::to_string))
            .unwrap_or_else(|| "Unknown error".to_string());

        Self::Upstream {
            status: status.as_u16(),
            message,
        }
    }
}

impl From<reqwest::Error> for ImageRelayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_connect() {
            Self::Network(err.to_string())
        } else {
            Self::Unknown(err.to_string())
        }
    }
}
