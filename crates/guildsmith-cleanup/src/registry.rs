//! Registry of live sessions.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;

use crate::error::{CleanupError, CleanupResult};
use crate::session::{LiveSession, SessionId};

/// Process-wide map from session id to live session.
///
/// Passed around by handle. Entries are removed when a session reaches a
/// terminal status.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: DashMap<SessionId, Arc<LiveSession>>,
}

impl SessionRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session under its id.
    ///
    /// # Errors
    ///
    /// Returns [`CleanupError::Conflict`] if the id is already live. The
    /// existing session is left untouched.
    pub fn register(&self, session: Arc<LiveSession>) -> CleanupResult<()> {
        let id = session.id();
        match self.sessions.entry(id) {
            Entry::Occupied(occupied) => Err(CleanupError::Conflict(occupied.key().clone())),
            Entry::Vacant(vacant) => {
                vacant.insert(session);
                Ok(())
            },
        }
    }

    /// Look up a live session.
    #[must_use]
    pub fn get(&self, id: &SessionId) -> Option<Arc<LiveSession>> {
        self.sessions.get(id).map(|entry| Arc::clone(entry.value()))
    }

    /// Remove a session. Returns it if it was present.
    pub fn remove(&self, id: &SessionId) -> Option<Arc<LiveSession>> {
        self.sessions.remove(id).map(|(_, session)| session)
    }

    /// Number of live sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether no session is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Ids of every live session.
    #[must_use]
    pub fn ids(&self) -> Vec<SessionId> {
        self.sessions.iter().map(|entry| entry.key().clone()).collect()
    }
}
