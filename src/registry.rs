//! Concurrency-safe registry of active engine sessions.
//!
//! Maps a principal to its active [`EngineSession`] so sessions can be
//! reused across calls instead of re-established per request. A new login
//! for the same principal replaces the previous entry (last login wins).
//! There is deliberately no TTL or eviction: an entry lives until it is
//! removed or replaced, and a stale entry is corrected the next time the
//! executor sees a 401.
//!
//! Locking is scoped strictly to the map access itself; no network I/O
//! ever happens while a shard lock is held.

use crate::engine::EngineSession;
use dashmap::DashMap;

#[derive(Default)]
pub struct SessionRegistry {
    sessions: DashMap<String, EngineSession>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores or replaces the session for its principal.
    pub fn set(&self, session: EngineSession) {
        self.sessions
            .insert(session.principal().to_string(), session);
    }

    /// Returns a copy of the principal's session, if one is registered.
    pub fn get(&self, principal: &str) -> Option<EngineSession> {
        self.sessions.get(principal).map(|entry| entry.value().clone())
    }

    /// Removes and returns the principal's session, if one was registered.
    pub fn remove(&self, principal: &str) -> Option<EngineSession> {
        self.sessions.remove(principal).map(|(_, session)| session)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
