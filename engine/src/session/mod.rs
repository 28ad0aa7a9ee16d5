//! Browser session contexts
//!
//! Each browser session owns one [`SessionContext`]: its transcript and the
//! user id it last logged in as. Contexts are looked up by the UUID carried in
//! the session cookie and sit behind their own async mutex, which the web
//! layer holds for a whole exchange. Contexts idle longer than the configured
//! limit are swept.

use chrono::{DateTime, Duration, Utc};
use sdk::errors::EngineError;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};
use uuid::Uuid;

use crate::clock::{Clock, SystemClock};
use crate::conversation::ConversationMemory;

/// State of one browser session
#[derive(Debug)]
pub struct SessionContext {
    id: Uuid,
    pub transcript: ConversationMemory,
    pub logged_in_as: Option<String>,
    created_at: DateTime<Utc>,
}

impl SessionContext {
    fn new(id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            id,
            transcript: ConversationMemory::new(),
            logged_in_as: None,
            created_at: now,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Shared handle to a session context
pub type SessionHandle = Arc<tokio::sync::Mutex<SessionContext>>;

struct Entry {
    handle: SessionHandle,
    last_seen: DateTime<Utc>,
}

/// Process-wide map of live session contexts
pub struct SessionStore {
    sessions: Mutex<HashMap<Uuid, Entry>>,
    idle_limit: Duration,
    clock: Arc<dyn Clock>,
}

impl SessionStore {
    pub fn new(idle_minutes: i64, clock: Arc<dyn Clock>) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            idle_limit: Duration::try_minutes(idle_minutes).unwrap_or(Duration::MAX),
            clock,
        }
    }

    /// Store on the system clock
    pub fn with_idle_minutes(idle_minutes: i64) -> Self {
        Self::new(idle_minutes, Arc::new(SystemClock))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, Entry>> {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Start a new session and return its id and handle
    pub fn create(&self) -> (Uuid, SessionHandle) {
        let now = self.clock.now();
        let id = Uuid::new_v4();
        let handle = Arc::new(tokio::sync::Mutex::new(SessionContext::new(id, now)));

        self.lock().insert(
            id,
            Entry {
                handle: Arc::clone(&handle),
                last_seen: now,
            },
        );

        debug!("Session {} created", id);
        (id, handle)
    }

    /// Look up a live session and mark it as seen
    ///
    /// # Errors
    ///
    /// `SessionNotFound` when the id is unknown, was ended, or has been idle
    /// past the limit.
    pub fn get(&self, id: Uuid) -> Result<SessionHandle, EngineError> {
        let now = self.clock.now();
        let mut sessions = self.lock();

        let expired = match sessions.get_mut(&id) {
            Some(entry) if now - entry.last_seen <= self.idle_limit => {
                entry.last_seen = now;
                return Ok(Arc::clone(&entry.handle));
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            sessions.remove(&id);
            debug!("Session {} expired on access", id);
        }
        Err(EngineError::SessionNotFound(id.to_string()))
    }

    /// Resume the session named by a cookie value, or start a new one
    ///
    /// Returns `(id, handle, created)`.
    pub fn resume_or_create(&self, cookie: Option<&str>) -> (Uuid, SessionHandle, bool) {
        if let Some(id) = cookie.and_then(|v| Uuid::parse_str(v.trim()).ok()) {
            if let Ok(handle) = self.get(id) {
                return (id, handle, false);
            }
        }
        let (id, handle) = self.create();
        (id, handle, true)
    }

    /// Discard a session and its transcript. Returns false if it was unknown.
    pub fn end(&self, id: Uuid) -> bool {
        let removed = self.lock().remove(&id).is_some();
        if removed {
            info!("Session {} ended", id);
        }
        removed
    }

    /// Drop every session idle past the limit and return how many went
    pub fn sweep_idle(&self) -> usize {
        let now = self.clock.now();
        let mut sessions = self.lock();
        let before = sessions.len();
        sessions.retain(|_, entry| now - entry.last_seen <= self.idle_limit);
        let swept = before - sessions.len();

        if swept > 0 {
            info!("Swept {} idle sessions ({} remain)", swept, sessions.len());
        }
        swept
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use sdk::types::Turn;

    fn store() -> (SessionStore, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let store = SessionStore::new(60, Arc::clone(&clock) as Arc<dyn Clock>);
        (store, clock)
    }

    #[tokio::test]
    async fn test_resume_returns_same_context() {
        let (store, _) = store();
        let (id, handle, created) = store.resume_or_create(None);
        assert!(created);
        handle.lock().await.transcript.record(Turn::user("hello"));

        let (again, handle, created) = store.resume_or_create(Some(id.to_string().as_str()));
        assert!(!created);
        assert_eq!(again, id);
        assert_eq!(handle.lock().await.transcript.len(), 1);
    }

    #[test]
    fn test_garbage_cookie_starts_new_session() {
        let (store, _) = store();
        let (_, _, created) = store.resume_or_create(Some("not-a-uuid"));
        assert!(created);

        let unknown = Uuid::new_v4().to_string();
        let (id, _, created) = store.resume_or_create(Some(unknown.as_str()));
        assert!(created);
        assert_ne!(id.to_string(), unknown);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_end_discards_session() {
        let (store, _) = store();
        let (id, _) = store.create();

        assert!(store.end(id));
        assert!(!store.end(id));
        assert!(matches!(store.get(id), Err(EngineError::SessionNotFound(_))));
    }

    #[test]
    fn test_idle_sessions_are_swept() {
        let (store, clock) = store();
        let (stale, _) = store.create();
        clock.advance(Duration::minutes(45));
        let (fresh, _) = store.create();
        clock.advance(Duration::minutes(30));

        assert_eq!(store.sweep_idle(), 1);
        assert!(store.get(stale).is_err());
        assert!(store.get(fresh).is_ok());
    }

    #[test]
    fn test_access_refreshes_last_seen() {
        let (store, clock) = store();
        let (id, _) = store.create();

        clock.advance(Duration::minutes(50));
        assert!(store.get(id).is_ok());
        clock.advance(Duration::minutes(50));
        assert!(store.get(id).is_ok());

        clock.advance(Duration::minutes(61));
        assert!(store.get(id).is_err());
        assert!(store.is_empty());
    }
}
