use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Kind of a room broadcast message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    ModeChange,
    GenerationStart,
    GenerationComplete,
    GenerationError,
}

impl MessageType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ModeChange => "mode_change",
            Self::GenerationStart => "generation_start",
            Self::GenerationComplete => "generation_complete",
            Self::GenerationError => "generation_error",
        }
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload of the `message` socket event
///
/// Never stored; it only lives for the duration of one relay send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BroadcastMessage {
    #[serde(rename = "type")]
    pub message_type: MessageType,
    pub data: Value,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
}

impl BroadcastMessage {
    #[must_use]
    pub fn new(message_type: MessageType, data: Value) -> Self {
        Self {
            message_type,
            data,
            timestamp: Utc::now().timestamp_millis(),
        }
    }

    #[must_use]
    pub fn mode_change(mode: &str) -> Self {
        Self::new(MessageType::ModeChange, json!({ "mode": mode }))
    }

    #[must_use]
    pub fn generation_start(data: Value) -> Self {
        Self::new(MessageType::GenerationStart, data)
    }

    #[must_use]
    pub fn generation_complete(result: Value) -> Self {
        Self::new(MessageType::GenerationComplete, result)
    }

    #[must_use]
    pub fn generation_error(error: &str) -> Self {
        Self::new(MessageType::GenerationError, json!({ "error": error }))
    }
}
