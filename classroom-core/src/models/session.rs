use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::id::{ConnectionId, SessionId};

/// What the whiteboard is currently showing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionMode {
    #[default]
    Idle,
    ImageGeneration,
}

impl SessionMode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::ImageGeneration => "image_generation",
        }
    }
}

impl FromStr for SessionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "idle" => Ok(Self::Idle),
            "image_generation" => Ok(Self::ImageGeneration),
            other => Err(format!("Unknown session mode: {other}")),
        }
    }
}

impl std::fmt::Display for SessionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The two logical participants of a classroom session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Teacher,
    Whiteboard,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Teacher => "teacher",
            Self::Whiteboard => "whiteboard",
        }
    }

    /// The counterpart role in the same session
    #[must_use]
    pub const fn other(self) -> Self {
        match self {
            Self::Teacher => Self::Whiteboard,
            Self::Whiteboard => Self::Teacher,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// In-memory record of one classroom session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: SessionId,
    pub teacher_connection_id: Option<ConnectionId>,
    pub whiteboard_connection_id: Option<ConnectionId>,
    pub current_mode: SessionMode,
    pub last_activity_at: DateTime<Utc>,
}

impl Session {
    #[must_use]
    pub const fn new(id: SessionId, now: DateTime<Utc>) -> Self {
        Self {
            id,
            teacher_connection_id: None,
            whiteboard_connection_id: None,
            current_mode: SessionMode::Idle,
            last_activity_at: now,
        }
    }

    /// Connection currently recorded for `role`
    #[must_use]
    pub const fn connection(&self, role: Role) -> Option<&ConnectionId> {
        match role {
            Role::Teacher => self.teacher_connection_id.as_ref(),
            Role::Whiteboard => self.whiteboard_connection_id.as_ref(),
        }
    }

    /// Record `connection_id` for `role`, returning the connection it replaced
    pub fn set_connection(
        &mut self,
        role: Role,
        connection_id: Option<ConnectionId>,
    ) -> Option<ConnectionId> {
        match role {
            Role::Teacher => std::mem::replace(&mut self.teacher_connection_id, connection_id),
            Role::Whiteboard => std::mem::replace(&mut self.whiteboard_connection_id, connection_id),
        }
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_activity_at = now;
    }
}
