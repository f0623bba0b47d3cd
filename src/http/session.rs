//! Session registry: the single source of truth for session lifetime.

use crate::protocol::{McpServer, SseServerTransport};
use crate::server::WidgetHandler;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::debug;

/// One active session: a protocol-server instance and the transport handle
/// it is bound to, owned exclusively by that session.
#[derive(Clone)]
pub struct SessionRecord {
    pub server: Arc<McpServer<WidgetHandler>>,
    pub transport: Arc<SseServerTransport>,
}

impl std::fmt::Debug for SessionRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRecord").finish_non_exhaustive()
    }
}

/// Concurrent map from session id to session record.
///
/// Constructed once at process start and passed by reference to the
/// connection router. Insert and remove are single atomic map operations;
/// session ids are unique per connection, so no two logical operations race
/// on the same key.
pub struct SessionRegistry {
    sessions: DashMap<String, SessionRecord>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    /// Insert a session record under the transport-assigned session id.
    pub fn add(&self, session_id: impl Into<String>, record: SessionRecord) {
        let session_id = session_id.into();
        debug!("Registering session {}", session_id);
        self.sessions.insert(session_id, record);
    }

    /// Look up a session. Never fails; absence is an explicit `None`.
    pub fn get(&self, session_id: &str) -> Option<SessionRecord> {
        self.sessions.get(session_id).map(|r| r.value().clone())
    }

    /// Remove a session if present. Idempotent: removing an absent id is a
    /// no-op.
    pub fn remove(&self, session_id: &str) {
        if self.sessions.remove(session_id).is_some() {
            debug!("Removed session {}", session_id);
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn first_session_id(&self) -> Option<String> {
        self.sessions.iter().next().map(|entry| entry.key().clone())
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
