//! Socket wire events
//!
//! Every frame is a JSON text message shaped `{"event": <name>, "data": <payload>}`.

use classroom_core::models::{BroadcastMessage, Role, SessionId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `{sessionId}` payload of the connect/disconnect notifications
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionNotice {
    pub session_id: SessionId,
}

/// Events pushed from the server to sockets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    TeacherConnected(SessionNotice),
    TeacherDisconnected(SessionNotice),
    WhiteboardConnected(SessionNotice),
    WhiteboardDisconnected(SessionNotice),
    Message(BroadcastMessage),
}

impl ServerEvent {
    #[must_use]
    pub fn connected(role: Role, session_id: SessionId) -> Self {
        let notice = SessionNotice { session_id };
        match role {
            Role::Teacher => Self::TeacherConnected(notice),
            Role::Whiteboard => Self::WhiteboardConnected(notice),
        }
    }

    #[must_use]
    pub fn disconnected(role: Role, session_id: SessionId) -> Self {
        let notice = SessionNotice { session_id };
        match role {
            Role::Teacher => Self::TeacherDisconnected(notice),
            Role::Whiteboard => Self::WhiteboardDisconnected(notice),
        }
    }

    /// Wire name of the event, for logs
    #[must_use]
    pub const fn event_type(&self) -> &'static str {
        match self {
            Self::TeacherConnected(_) => "teacher_connected",
            Self::TeacherDisconnected(_) => "teacher_disconnected",
            Self::WhiteboardConnected(_) => "whiteboard_connected",
            Self::WhiteboardDisconnected(_) => "whiteboard_disconnected",
            Self::Message(_) => "message",
        }
    }
}

/// `mode_change` payload sent by the teacher
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModeChange {
    pub session_id: SessionId,
    pub mode: String,
}

/// Events sent by sockets to the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    JoinAsTeacher(SessionId),
    JoinAsWhiteboard(SessionId),
    ModeChange(ModeChange),
    /// Free-form request; must carry a `sessionId` string
    GenerationRequest(Value),
}

impl ClientEvent {
    /// Decode one text frame
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// Pull the `sessionId` out of a free-form generation request
#[must_use]
pub fn generation_request_session(payload: &Value) -> Option<SessionId> {
    payload
        .get("sessionId")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(SessionId::from)
}
