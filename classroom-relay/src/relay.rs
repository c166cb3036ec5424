use std::sync::Arc;

use classroom_core::models::{BroadcastMessage, ConnectionId, Role, Session, SessionId, SessionMode};
use classroom_core::service::SessionStore;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::events::{generation_request_session, ModeChange, ServerEvent};
use crate::hub::{MessageSender, RoomMessageHub};

/// Routes classroom events between the sockets of a session room
///
/// Keeps room membership (the hub) and session bookkeeping (the store) in
/// step: joins and disconnects update both before anyone is notified.
#[derive(Clone)]
pub struct BroadcastRelay {
    hub: RoomMessageHub,
    sessions: Arc<SessionStore>,
}

impl BroadcastRelay {
    #[must_use]
    pub fn new(sessions: Arc<SessionStore>) -> Self {
        Self {
            hub: RoomMessageHub::new(),
            sessions,
        }
    }

    #[must_use]
    pub const fn hub(&self) -> &RoomMessageHub {
        &self.hub
    }

    #[must_use]
    pub const fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    /// Put a connection in the session's room under `role` and tell the others
    pub fn join_room(
        &self,
        connection_id: &ConnectionId,
        session_id: &SessionId,
        role: Role,
        sender: MessageSender,
    ) -> Session {
        self.hub.subscribe(session_id, connection_id, role, sender);
        let session = self.sessions.join(session_id, connection_id, role);

        let notified = self.hub.broadcast(
            session_id,
            &ServerEvent::connected(role, session_id.clone()),
            Some(connection_id),
        );
        debug!(
            session_id = %session_id,
            role = %role,
            notified,
            "Announced join to room"
        );

        session
    }

    /// Send a message to everyone in the room except `from`
    pub fn relay(
        &self,
        from: &ConnectionId,
        session_id: &SessionId,
        message: BroadcastMessage,
    ) -> usize {
        self.hub
            .broadcast(session_id, &ServerEvent::Message(message), Some(from))
    }

    /// Apply a teacher's mode switch and forward it to the rest of the room
    ///
    /// Unknown modes are dropped; returns `None` in that case.
    pub fn relay_mode_change(&self, from: &ConnectionId, change: ModeChange) -> Option<usize> {
        let mode = match change.mode.parse::<SessionMode>() {
            Ok(mode) => mode,
            Err(err) => {
                warn!(
                    session_id = %change.session_id,
                    connection_id = %from,
                    error = %err,
                    "Ignoring mode change"
                );
                return None;
            }
        };

        self.sessions.set_mode(&change.session_id, mode);
        info!(session_id = %change.session_id, mode = %mode, "Session mode changed");

        Some(self.relay(
            from,
            &change.session_id,
            BroadcastMessage::mode_change(mode.as_str()),
        ))
    }

    /// Forward a generation request to the peers as `generation_start`
    ///
    /// The payload is passed through untouched. Requests without a
    /// `sessionId` are dropped.
    pub fn relay_generation_request(&self, from: &ConnectionId, payload: Value) -> Option<usize> {
        let Some(session_id) = generation_request_session(&payload) else {
            warn!(connection_id = %from, "Generation request without sessionId ignored");
            return None;
        };

        info!(session_id = %session_id, "Generation requested");
        Some(self.relay(from, &session_id, BroadcastMessage::generation_start(payload)))
    }

    /// Send a message to the whole room
    pub fn broadcast_to_session(&self, session_id: &SessionId, message: BroadcastMessage) -> usize {
        self.hub
            .broadcast(session_id, &ServerEvent::Message(message), None)
    }

    /// Publish the outcome of an image edit to the whole room
    pub fn broadcast_result(&self, session_id: &SessionId, outcome: Result<&Value, &str>) -> usize {
        let message = match outcome {
            Ok(result) => BroadcastMessage::generation_complete(result.clone()),
            Err(error) => BroadcastMessage::generation_error(error),
        };
        self.broadcast_to_session(session_id, message)
    }

    /// Tear down everything a closed socket held
    ///
    /// Returns the `(session, role)` slots that were cleared.
    pub fn on_disconnect(&self, connection_id: &ConnectionId) -> Vec<(SessionId, Role)> {
        let rooms = self.hub.unsubscribe(connection_id);
        let cleared = self.sessions.clear_connection(connection_id);

        for (session_id, role) in &cleared {
            self.hub.broadcast(
                session_id,
                &ServerEvent::disconnected(*role, session_id.clone()),
                None,
            );
            info!(
                session_id = %session_id,
                connection_id = %connection_id,
                role = %role,
                "Left classroom session"
            );
        }

        debug!(
            connection_id = %connection_id,
            rooms = rooms.len(),
            cleared = cleared.len(),
            "Connection cleaned up"
        );

        cleared
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use classroom_core::models::MessageType;
    use serde_json::json;
    use std::time::Duration;
    use tokio::sync::mpsc;

    fn relay() -> BroadcastRelay {
        BroadcastRelay::new(Arc::new(SessionStore::new()))
    }

    async fn next(rx: &mut mpsc::UnboundedReceiver<ServerEvent>) -> ServerEvent {
        tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("timed out waiting for event")
            .expect("channel closed")
    }

    fn assert_silent(rx: &mut mpsc::UnboundedReceiver<ServerEvent>) {
        assert!(rx.try_recv().is_err(), "unexpected event");
    }

    #[tokio::test]
    async fn test_join_announces_to_others() {
        let relay = relay();
        let session = SessionId::from("s1");
        let (tx_t, mut rx_t) = mpsc::unbounded_channel();
        let (tx_w, mut rx_w) = mpsc::unbounded_channel();

        relay.join_room(&ConnectionId::from("t"), &session, Role::Teacher, tx_t);
        let stored = relay.join_room(&ConnectionId::from("w"), &session, Role::Whiteboard, tx_w);

        assert_eq!(
            next(&mut rx_t).await,
            ServerEvent::connected(Role::Whiteboard, session.clone())
        );
        assert_silent(&mut rx_w);

        assert_eq!(stored.teacher_connection_id, Some(ConnectionId::from("t")));
        assert_eq!(stored.whiteboard_connection_id, Some(ConnectionId::from("w")));
        assert_eq!(stored.current_mode, SessionMode::Idle);
    }

    #[tokio::test]
    async fn test_mode_change_stays_in_room_and_skips_sender() {
        let relay = relay();
        let room_a = SessionId::from("a");
        let room_b = SessionId::from("b");
        let teacher = ConnectionId::from("teacher-a");

        let (tx_t, mut rx_t) = mpsc::unbounded_channel();
        let (tx_wa, mut rx_wa) = mpsc::unbounded_channel();
        let (tx_wb, mut rx_wb) = mpsc::unbounded_channel();

        relay.join_room(&teacher, &room_a, Role::Teacher, tx_t);
        relay.join_room(&ConnectionId::from("board-a"), &room_a, Role::Whiteboard, tx_wa);
        relay.join_room(&ConnectionId::from("board-b"), &room_b, Role::Whiteboard, tx_wb);
        // drain the join notice
        next(&mut rx_t).await;

        let delivered = relay.relay_mode_change(
            &teacher,
            ModeChange {
                session_id: room_a.clone(),
                mode: "image_generation".to_string(),
            },
        );
        assert_eq!(delivered, Some(1));

        match next(&mut rx_wa).await {
            ServerEvent::Message(message) => {
                assert_eq!(message.message_type, MessageType::ModeChange);
                assert_eq!(message.data, json!({ "mode": "image_generation" }));
            }
            other => panic!("expected message, got {other:?}"),
        }
        assert_silent(&mut rx_t);
        assert_silent(&mut rx_wb);

        let session = relay.sessions().get(&room_a).unwrap();
        assert_eq!(session.current_mode, SessionMode::ImageGeneration);
    }

    #[tokio::test]
    async fn test_unknown_mode_is_dropped() {
        let relay = relay();
        let session = SessionId::from("s1");
        let (tx_w, mut rx_w) = mpsc::unbounded_channel();
        relay.join_room(&ConnectionId::from("w"), &session, Role::Whiteboard, tx_w);

        let delivered = relay.relay_mode_change(
            &ConnectionId::from("t"),
            ModeChange {
                session_id: session.clone(),
                mode: "karaoke".to_string(),
            },
        );

        assert_eq!(delivered, None);
        assert_silent(&mut rx_w);
        assert_eq!(relay.sessions().get(&session).unwrap().current_mode, SessionMode::Idle);
    }

    #[tokio::test]
    async fn test_generation_request_becomes_generation_start() {
        let relay = relay();
        let session = SessionId::from("s1");
        let teacher = ConnectionId::from("t");
        let (tx_t, _rx_t) = mpsc::unbounded_channel();
        let (tx_w, mut rx_w) = mpsc::unbounded_channel();
        relay.join_room(&teacher, &session, Role::Teacher, tx_t);
        relay.join_room(&ConnectionId::from("w"), &session, Role::Whiteboard, tx_w);

        let payload = json!({ "sessionId": "s1", "prompt": "a red fox" });
        assert_eq!(relay.relay_generation_request(&teacher, payload.clone()), Some(1));

        match next(&mut rx_w).await {
            ServerEvent::Message(message) => {
                assert_eq!(message.message_type, MessageType::GenerationStart);
                assert_eq!(message.data, payload);
            }
            other => panic!("expected message, got {other:?}"),
        }

        assert_eq!(
            relay.relay_generation_request(&teacher, json!({ "prompt": "x" })),
            None
        );
    }

    #[tokio::test]
    async fn test_broadcast_result_reaches_everyone() {
        let relay = relay();
        let session = SessionId::from("s1");
        let (tx_t, mut rx_t) = mpsc::unbounded_channel();
        let (tx_w, mut rx_w) = mpsc::unbounded_channel();
        relay.join_room(&ConnectionId::from("t"), &session, Role::Teacher, tx_t);
        relay.join_room(&ConnectionId::from("w"), &session, Role::Whiteboard, tx_w);
        next(&mut rx_t).await;

        assert_eq!(relay.broadcast_result(&session, Err("API error (500): boom")), 2);
        for rx in [&mut rx_t, &mut rx_w] {
            match next(rx).await {
                ServerEvent::Message(message) => {
                    assert_eq!(message.message_type, MessageType::GenerationError);
                    assert_eq!(message.data["error"], "API error (500): boom");
                }
                other => panic!("expected message, got {other:?}"),
            }
        }

        let body = json!({ "data": [{ "url": "https://img" }] });
        assert_eq!(relay.broadcast_result(&session, Ok(&body)), 2);
        match next(&mut rx_w).await {
            ServerEvent::Message(message) => {
                assert_eq!(message.message_type, MessageType::GenerationComplete);
                assert_eq!(message.data, body);
            }
            other => panic!("expected message, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_disconnect_clears_and_notifies() {
        let relay = relay();
        let session = SessionId::from("s1");
        let teacher = ConnectionId::from("t");
        let (tx_t, _rx_t) = mpsc::unbounded_channel();
        let (tx_w, mut rx_w) = mpsc::unbounded_channel();
        relay.join_room(&ConnectionId::from("w"), &session, Role::Whiteboard, tx_w);
        relay.join_room(&teacher, &session, Role::Teacher, tx_t);
        next(&mut rx_w).await;

        let cleared = relay.on_disconnect(&teacher);
        assert_eq!(cleared, vec![(session.clone(), Role::Teacher)]);

        assert_eq!(
            next(&mut rx_w).await,
            ServerEvent::disconnected(Role::Teacher, session.clone())
        );

        let stored = relay.sessions().get(&session).unwrap();
        assert_eq!(stored.teacher_connection_id, None);
        assert_eq!(stored.whiteboard_connection_id, Some(ConnectionId::from("w")));
        assert_eq!(relay.hub().subscriber_count(&session), 1);

        // second disconnect is a no-op
        assert!(relay.on_disconnect(&teacher).is_empty());
    }
}
