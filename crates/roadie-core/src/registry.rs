//! Attached-connection bookkeeping for a single coordinator actor.

use std::collections::HashMap;
use std::fmt;

use tokio::sync::mpsc;
use uuid::Uuid;

/// Identifies one live socket. Fresh per physical connection, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Outbound half of one socket. The coordinator holds these and pushes
/// serialized events; the socket task owns the receiving end.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    outbound: mpsc::Sender<String>,
}

impl ConnectionHandle {
    pub fn new(id: ConnectionId, outbound: mpsc::Sender<String>) -> Self {
        Self { id, outbound }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Queues a frame without waiting. A full or closed queue is reported
    /// back so the caller can log it; the actor never blocks on a slow
    /// socket.
    pub fn enqueue(&self, frame: String) -> Result<(), mpsc::error::TrySendError<String>> {
        self.outbound.try_send(frame)
    }
}

/// One attachment: a connection bound to an interaction under a session key.
#[derive(Debug, Clone)]
pub struct Session {
    session_key: String,
    interaction_id: String,
    conn: ConnectionHandle,
}

impl Session {
    pub fn session_key(&self) -> &str {
        &self.session_key
    }

    pub fn interaction_id(&self) -> &str {
        &self.interaction_id
    }

    pub fn conn(&self) -> &ConnectionHandle {
        &self.conn
    }
}

/// All sessions currently attached to one actor. Owned by the actor task,
/// so access is inherently serialized.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: HashMap<ConnectionId, Session>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds a connection to an interaction and returns the session key.
    /// Re-attaching an existing connection replaces its previous binding.
    pub fn register(&mut self, conn: ConnectionHandle, interaction_id: String) -> String {
        let session_key = Uuid::new_v4().to_string();
        self.sessions.insert(
            conn.id(),
            Session {
                session_key: session_key.clone(),
                interaction_id,
                conn,
            },
        );
        session_key
    }

    pub fn lookup(&self, id: ConnectionId) -> Option<&Session> {
        self.sessions.get(&id)
    }

    /// Removes and returns the session, dropping the registry's hold on the
    /// connection's outbound sender.
    pub fn unregister(&mut self, id: ConnectionId) -> Option<Session> {
        self.sessions.remove(&id)
    }

    pub fn connections(&self) -> impl Iterator<Item = &ConnectionHandle> {
        self.sessions.values().map(|s| s.conn())
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
