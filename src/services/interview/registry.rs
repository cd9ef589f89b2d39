//! Session Registry
//!
//! Live sessions keyed by session id. Each session sits behind its own async
//! mutex so turns on one session are serialized while different sessions
//! proceed in parallel. Sessions idle past the TTL are evicted by a periodic
//! sweep; a session whose lock is currently held elsewhere is never evicted.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::sync::Mutex;

use super::session::InterviewSession;

/// A live session shared between requests
pub type SharedSession = Arc<Mutex<InterviewSession>>;

/// Storage for live sessions
pub trait SessionStore: Send + Sync {
    /// Register a new session and hand back its shared handle
    fn insert(&self, session: InterviewSession) -> SharedSession;

    /// Look up a session, refreshing its last access time
    fn get(&self, session_id: &str) -> Option<SharedSession>;

    fn remove(&self, session_id: &str) -> Option<SharedSession>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop sessions idle for longer than `ttl`; returns how many were dropped
    fn evict_expired(&self, ttl: Duration) -> usize;
}

struct Entry {
    session: SharedSession,
    last_access: Instant,
}

/// Process-local session store
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: DashMap<String, Entry>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Evict relative to an explicit clock reading
    pub fn evict_expired_at(&self, now: Instant, ttl: Duration) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, entry| {
            let idle = now.saturating_duration_since(entry.last_access);
            idle <= ttl || Arc::strong_count(&entry.session) > 1
        });
        before.saturating_sub(self.sessions.len())
    }
}

impl SessionStore for InMemorySessionStore {
    fn insert(&self, session: InterviewSession) -> SharedSession {
        let id = session.session_id.clone();
        let shared = Arc::new(Mutex::new(session));
        self.sessions.insert(
            id,
            Entry {
                session: shared.clone(),
                last_access: Instant::now(),
            },
        );
        shared
    }

    fn get(&self, session_id: &str) -> Option<SharedSession> {
        let mut entry = self.sessions.get_mut(session_id)?;
        entry.last_access = Instant::now();
        Some(entry.session.clone())
    }

    fn remove(&self, session_id: &str) -> Option<SharedSession> {
        self.sessions.remove(session_id).map(|(_, entry)| entry.session)
    }

    fn len(&self) -> usize {
        self.sessions.len()
    }

    fn evict_expired(&self, ttl: Duration) -> usize {
        self.evict_expired_at(Instant::now(), ttl)
    }
}
