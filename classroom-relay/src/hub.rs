use classroom_core::models::{ConnectionId, Role, SessionId};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::events::ServerEvent;

/// Message sender for a socket connection
pub type MessageSender = mpsc::UnboundedSender<ServerEvent>;

/// Subscriber information
#[derive(Debug, Clone)]
pub struct Subscriber {
    pub connection_id: ConnectionId,
    pub role: Role,
    pub sender: MessageSender,
}

/// In-memory hub routing events to sockets joined to session rooms
///
/// A socket may sit in several rooms at once; each membership reuses the
/// socket's single outbound channel.
#[derive(Clone)]
pub struct RoomMessageHub {
    /// Map of session_id -> room members
    rooms: Arc<DashMap<SessionId, Vec<Subscriber>>>,

    /// Map of connection_id -> rooms it joined, for cleanup
    connections: Arc<DashMap<ConnectionId, Vec<SessionId>>>,
}

impl RoomMessageHub {
    /// Create a new `RoomMessageHub`
    #[must_use]
    pub fn new() -> Self {
        Self {
            rooms: Arc::new(DashMap::new()),
            connections: Arc::new(DashMap::new()),
        }
    }

    /// Add a connection to a session room
    ///
    /// Joining the same room again only updates the recorded role.
    pub fn subscribe(
        &self,
        session_id: &SessionId,
        connection_id: &ConnectionId,
        role: Role,
        sender: MessageSender,
    ) {
        {
            let mut members = self.rooms.entry(session_id.clone()).or_default();
            if let Some(existing) = members
                .iter_mut()
                .find(|sub| sub.connection_id == *connection_id)
            {
                existing.role = role;
                existing.sender = sender;
            } else {
                members.push(Subscriber {
                    connection_id: connection_id.clone(),
                    role,
                    sender,
                });
            }
        }

        let mut joined = self.connections.entry(connection_id.clone()).or_default();
        if !joined.contains(session_id) {
            joined.push(session_id.clone());
        }
        drop(joined);

        info!(
            room = %session_id.room_name(),
            connection_id = %connection_id,
            role = %role,
            "Connection joined room"
        );
    }

    /// Remove a connection from every room it joined
    ///
    /// Returns the sessions whose rooms it left.
    pub fn unsubscribe(&self, connection_id: &ConnectionId) -> Vec<SessionId> {
        let Some((_, session_ids)) = self.connections.remove(connection_id) else {
            debug!(connection_id = %connection_id, "Unsubscribe for connection with no rooms");
            return Vec::new();
        };

        for session_id in &session_ids {
            if let Some(mut members) = self.rooms.get_mut(session_id) {
                members.retain(|sub| sub.connection_id != *connection_id);
            }
            if self
                .rooms
                .remove_if(session_id, |_, members| members.is_empty())
                .is_some()
            {
                debug!(room = %session_id.room_name(), "Room has no more members, removed");
            }
        }

        info!(
            connection_id = %connection_id,
            rooms = session_ids.len(),
            "Connection left all rooms"
        );

        session_ids
    }

    /// Send an event to every member of a session room, optionally skipping one connection
    ///
    /// Returns how many members the event was handed to.
    pub fn broadcast(
        &self,
        session_id: &SessionId,
        event: &ServerEvent,
        except: Option<&ConnectionId>,
    ) -> usize {
        let mut sent_count = 0;
        let mut failed_connections = Vec::new();

        if let Some(members) = self.rooms.get(session_id) {
            for member in members
                .iter()
                .filter(|m| Some(&m.connection_id) != except)
            {
                match member.sender.send(event.clone()) {
                    Ok(()) => {
                        sent_count += 1;
                        debug!(
                            room = %session_id.room_name(),
                            connection_id = %member.connection_id,
                            event_type = event.event_type(),
                            "Event sent to connection"
                        );
                    }
                    Err(err) => {
                        warn!(
                            room = %session_id.room_name(),
                            connection_id = %member.connection_id,
                            error = %err,
                            "Failed to send event to connection, marking for cleanup"
                        );
                        failed_connections.push(member.connection_id.clone());
                    }
                }
            }
        }

        // Clean up closed connections (the room guard is released by now)
        for connection_id in failed_connections {
            self.unsubscribe(&connection_id);
        }

        if sent_count == 0 {
            debug!(
                room = %session_id.room_name(),
                event_type = event.event_type(),
                "Event had no recipients"
            );
        }

        sent_count
    }

    /// Get the number of members in a session room
    #[must_use]
    pub fn subscriber_count(&self, session_id: &SessionId) -> usize {
        self.rooms.get(session_id).map_or(0, |members| members.len())
    }

    /// Get the number of active rooms
    #[must_use]
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Get total number of connections in at least one room
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Get all members of a room (for debugging/monitoring)
    #[must_use]
    pub fn get_room_subscribers(&self, session_id: &SessionId) -> Vec<(ConnectionId, Role)> {
        self.rooms
            .get(session_id)
            .map(|members| {
                members
                    .iter()
                    .map(|sub| (sub.connection_id.clone(), sub.role))
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl Default for RoomMessageHub {
    fn default() -> Self {
        Self::new()
    }
}
