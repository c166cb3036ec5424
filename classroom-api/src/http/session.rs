//! Session HTTP handlers

use axum::{
    extract::{Path, State},
    Json,
};
use classroom_core::models::{Session, SessionId};
use classroom_core::Error;
use serde::Serialize;
use tracing::info;

use crate::http::{AppResult, AppState};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionResponse {
    pub session_id: SessionId,
}

#[derive(Debug, Serialize)]
pub struct SessionListResponse {
    pub sessions: Vec<Session>,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session: Session,
}

/// Hand out a fresh session id
///
/// Nothing is stored until a socket joins with the id.
pub async fn create_session() -> Json<CreateSessionResponse> {
    let session_id = SessionId::new();
    info!(session_id = %session_id, "Created session id");
    Json(CreateSessionResponse { session_id })
}

pub async fn list_active_sessions(State(state): State<AppState>) -> Json<SessionListResponse> {
    let mut sessions = state.sessions.list_active();
    sessions.sort_by(|a, b| b.last_activity_at.cmp(&a.last_activity_at));
    Json(SessionListResponse { sessions })
}

pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> AppResult<Json<SessionResponse>> {
    let session = state
        .sessions
        .get(&SessionId::from(session_id))
        .ok_or_else(|| Error::NotFound("Session not found".to_string()))?;

    Ok(Json(SessionResponse { session }))
}
