//! In-memory classroom session store
//!
//! Sessions are created lazily by the first join for an id and evicted by an
//! absolute-age sweep. A reverse index from connection to sessions keeps
//! disconnect handling proportional to what the connection actually joined.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::models::{ConnectionId, Role, Session, SessionId, SessionMode};

#[derive(Debug, Default)]
struct SessionTable {
    sessions: HashMap<SessionId, Session>,
    /// connection -> sessions where it is recorded as teacher or whiteboard
    by_connection: HashMap<ConnectionId, HashSet<SessionId>>,
}

impl SessionTable {
    fn index(&mut self, connection_id: &ConnectionId, session_id: &SessionId) {
        self.by_connection
            .entry(connection_id.clone())
            .or_default()
            .insert(session_id.clone());
    }

    fn unindex(&mut self, connection_id: &ConnectionId, session_id: &SessionId) {
        if let Some(ids) = self.by_connection.get_mut(connection_id) {
            ids.remove(session_id);
            if ids.is_empty() {
                self.by_connection.remove(connection_id);
            }
        }
    }

    fn join(
        &mut self,
        session_id: &SessionId,
        connection_id: &ConnectionId,
        role: Role,
        now: DateTime<Utc>,
    ) -> Session {
        let session = self
            .sessions
            .entry(session_id.clone())
            .or_insert_with(|| Session::new(session_id.clone(), now));

        let previous = session.set_connection(role, Some(connection_id.clone()));
        session.touch(now);
        let snapshot = session.clone();

        if let Some(previous) = previous.filter(|p| p != connection_id) {
            // the replaced socket may still hold the other role here
            if snapshot.connection(role.other()) != Some(&previous) {
                self.unindex(&previous, session_id);
            }
        }
        self.index(connection_id, session_id);

        snapshot
    }
}

/// Shared registry of live classroom sessions
#[derive(Debug, Default)]
pub struct SessionStore {
    inner: Mutex<SessionTable>,
}

impl SessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `connection_id` as the session's teacher, creating the session if needed
    pub fn join_as_teacher(&self, session_id: &SessionId, connection_id: &ConnectionId) -> Session {
        self.join(session_id, connection_id, Role::Teacher)
    }

    /// Record `connection_id` as the session's whiteboard, creating the session if needed
    pub fn join_as_whiteboard(
        &self,
        session_id: &SessionId,
        connection_id: &ConnectionId,
    ) -> Session {
        self.join(session_id, connection_id, Role::Whiteboard)
    }

    pub fn join(&self, session_id: &SessionId, connection_id: &ConnectionId, role: Role) -> Session {
        let session = self
            .inner
            .lock()
            .join(session_id, connection_id, role, Utc::now());

        info!(
            session_id = %session_id,
            connection_id = %connection_id,
            role = %role,
            "Joined classroom session"
        );

        session
    }

    /// Update the session's mode; returns false when the session is unknown
    pub fn set_mode(&self, session_id: &SessionId, mode: SessionMode) -> bool {
        let mut table = self.inner.lock();
        let Some(session) = table.sessions.get_mut(session_id) else {
            debug!(session_id = %session_id, mode = %mode, "Mode change for unknown session ignored");
            return false;
        };

        session.current_mode = mode;
        session.touch(Utc::now());
        true
    }

    /// Blank every role slot held by `connection_id`
    ///
    /// Returns the `(session, role)` pairs that were cleared. Sessions are
    /// never removed here; only the sweep deletes them.
    pub fn clear_connection(&self, connection_id: &ConnectionId) -> Vec<(SessionId, Role)> {
        let mut table = self.inner.lock();
        let Some(session_ids) = table.by_connection.remove(connection_id) else {
            return Vec::new();
        };

        let mut cleared = Vec::new();
        for session_id in session_ids {
            let Some(session) = table.sessions.get_mut(&session_id) else {
                continue;
            };
            for role in [Role::Teacher, Role::Whiteboard] {
                if session.connection(role) == Some(connection_id) {
                    session.set_connection(role, None);
                    cleared.push((session_id.clone(), role));
                }
            }
        }
        drop(table);

        cleared.sort_by(|a, b| a.0.cmp(&b.0));
        if !cleared.is_empty() {
            debug!(
                connection_id = %connection_id,
                cleared = cleared.len(),
                "Cleared disconnected connection from sessions"
            );
        }
        cleared
    }

    #[must_use]
    pub fn get(&self, session_id: &SessionId) -> Option<Session> {
        self.inner.lock().sessions.get(session_id).cloned()
    }

    /// Snapshot of every session currently held
    #[must_use]
    pub fn list_active(&self) -> Vec<Session> {
        self.inner.lock().sessions.values().cloned().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().sessions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().sessions.is_empty()
    }

    /// Remove sessions idle for at least `max_inactive`, measured from now
    pub fn sweep(&self, max_inactive: Duration) -> Vec<SessionId> {
        self.sweep_at(Utc::now(), max_inactive)
    }

    /// Remove sessions whose last activity is at or before `now - max_inactive`
    pub fn sweep_at(&self, now: DateTime<Utc>, max_inactive: Duration) -> Vec<SessionId> {
        let max_inactive = TimeDelta::from_std(max_inactive).unwrap_or(TimeDelta::MAX);
        let cutoff = now.checked_sub_signed(max_inactive).unwrap_or(DateTime::<Utc>::MIN_UTC);

        let mut table = self.inner.lock();
        let expired: Vec<SessionId> = table
            .sessions
            .values()
            .filter(|s| s.last_activity_at <= cutoff)
            .map(|s| s.id.clone())
            .collect();

        for session_id in &expired {
            if let Some(session) = table.sessions.remove(session_id) {
                for connection_id in [session.teacher_connection_id, session.whiteboard_connection_id]
                    .into_iter()
                    .flatten()
                {
                    table.unindex(&connection_id, session_id);
                }
            }
        }
        drop(table);

        for session_id in &expired {
            info!(session_id = %session_id, "Cleaned up inactive session");
        }
        expired
    }

    /// Spawn the periodic sweep task
    pub fn start_sweeper(
        self: &Arc<Self>,
        interval: Duration,
        max_inactive: Duration,
    ) -> tokio::task::JoinHandle<()> {
        let store = Arc::clone(self);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // the first tick completes immediately
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let removed = store.sweep(max_inactive);
                debug!(
                    removed = removed.len(),
                    remaining = store.len(),
                    "Session sweep finished"
                );
            }
        })
    }
}
