//! # Session Store
//!
//! Process-wide mapping from session id to conversation history.
//!
//! ## Two kinds of locking:
//! - The history map is behind a `std::sync::RwLock`. It is only held for the
//!   duration of a single map operation and never across an `.await`.
//! - Each session id additionally owns an async mutex, handed out through
//!   [`SessionStore::lock`]. The voice pipeline holds it from history creation until
//!   the assistant turn is stored, so two requests for the same session cannot
//!   interleave their read-modify-write. Different sessions never wait on each other.
//!
//! Nothing here survives a restart.

use crate::session::history::{History, Turn};
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tokio::sync::OwnedMutexGuard;

/// Errors from store operations that require an existing session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// No history exists for this session id
    NotFound(String),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::NotFound(id) => write!(f, "Session not found: {}", id),
        }
    }
}

impl std::error::Error for SessionError {}

/// Exclusive access to one session id. Released on drop.
pub struct SessionGuard {
    session_id: String,
    _guard: OwnedMutexGuard<()>,
}

impl SessionGuard {
    pub fn session_id(&self) -> &str {
        &self.session_id
    }
}

/// Storage contract used by the conversation pipeline.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Reset the session to an empty history, creating it if needed.
    fn create(&self, session_id: &str);

    /// Drop the session's history. Unknown ids are ignored.
    fn delete(&self, session_id: &str);

    /// Current history, inserting an empty one for unknown ids.
    fn get_or_create(&self, session_id: &str) -> History;

    /// Append a turn to an existing session.
    fn append(&self, session_id: &str, turn: Turn) -> Result<(), SessionError>;

    /// Overwrite the session's history wholesale.
    fn replace(&self, session_id: &str, history: History);

    /// Snapshot of the history without creating anything.
    fn history(&self, session_id: &str) -> Option<History>;

    /// Number of live sessions.
    fn session_count(&self) -> usize;

    /// Wait for exclusive access to `session_id`.
    async fn lock(&self, session_id: &str) -> SessionGuard;
}

/// Default in-memory implementation of [`SessionStore`].
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, History>>,
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn session_lock(&self, session_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    fn create(&self, session_id: &str) {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        sessions.insert(session_id.to_string(), History::new());
    }

    fn delete(&self, session_id: &str) {
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(session_id);

        // Keep the mutex while anyone holds or awaits it, otherwise a waiter and a
        // newcomer could end up on two different locks for the same id.
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        if locks
            .get(session_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(session_id);
        }
    }

    fn get_or_create(&self, session_id: &str) -> History {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        sessions.entry(session_id.to_string()).or_default().clone()
    }

    fn append(&self, session_id: &str, turn: Turn) -> Result<(), SessionError> {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        let history = sessions
            .get_mut(session_id)
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))?;
        history.push(turn);
        Ok(())
    }

    fn replace(&self, session_id: &str, history: History) {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        sessions.insert(session_id.to_string(), history);
    }

    fn history(&self, session_id: &str) -> Option<History> {
        let sessions = self.sessions.read().unwrap_or_else(PoisonError::into_inner);
        sessions.get(session_id).cloned()
    }

    fn session_count(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    async fn lock(&self, session_id: &str) -> SessionGuard {
        let lock = self.session_lock(session_id);
        SessionGuard {
            session_id: session_id.to_string(),
            _guard: lock.lock_owned().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn filled(store: &InMemorySessionStore, session_id: &str, turns: usize) {
        store.create(session_id);
        for i in 0..turns {
            store.append(session_id, Turn::user(format!("t{}", i))).unwrap();
        }
    }

    #[test]
    fn test_get_or_create_unknown_session_is_empty() {
        let store = InMemorySessionStore::new();
        assert!(store.get_or_create("s1").is_empty());

        store.append("s1", Turn::user("hello")).unwrap();
        let history = store.get_or_create("s1");
        assert_eq!(history.turns(), &[Turn::user("hello")]);
    }

    #[test]
    fn test_create_resets_existing_history() {
        let store = InMemorySessionStore::new();
        filled(&store, "s1", 9);
        assert_eq!(store.get_or_create("s1").len(), 9);

        store.create("s1");
        assert!(store.get_or_create("s1").is_empty());
    }

    #[test]
    fn test_delete_then_get_or_create_is_empty() {
        let store = InMemorySessionStore::new();
        filled(&store, "s1", 4);

        store.delete("s1");
        assert!(store.history("s1").is_none());
        assert!(store.get_or_create("s1").is_empty());
    }

    #[test]
    fn test_delete_unknown_session_is_noop() {
        let store = InMemorySessionStore::new();
        store.delete("missing");
        assert_eq!(store.session_count(), 0);
    }

    #[test]
    fn test_append_requires_existing_session() {
        let store = InMemorySessionStore::new();
        let err = store.append("missing", Turn::user("hi")).unwrap_err();
        assert_eq!(err, SessionError::NotFound("missing".to_string()));
        assert!(store.history("missing").is_none());
    }

    #[test]
    fn test_replace_overwrites_history() {
        let store = InMemorySessionStore::new();
        filled(&store, "s1", 3);

        store.replace("s1", vec![Turn::assistant("only")].into());
        assert_eq!(store.history("s1").unwrap().turns(), &[Turn::assistant("only")]);
    }

    #[test]
    fn test_history_snapshot_is_detached() {
        let store = InMemorySessionStore::new();
        filled(&store, "s1", 1);

        let snapshot = store.history("s1").unwrap();
        store.append("s1", Turn::assistant("later")).unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(store.history("s1").unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_lock_serializes_same_session() {
        let store = Arc::new(InMemorySessionStore::new());
        let guard = store.lock("s1").await;
        assert_eq!(guard.session_id(), "s1");

        let contender = {
            let store = store.clone();
            tokio::spawn(async move {
                let _guard = store.lock("s1").await;
            })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!contender.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), contender)
            .await
            .expect("second lock should be granted")
            .unwrap();
    }

    #[tokio::test]
    async fn test_lock_does_not_block_other_sessions() {
        let store = InMemorySessionStore::new();
        let _a = store.lock("a").await;
        let b = tokio::time::timeout(Duration::from_millis(200), store.lock("b")).await;
        assert!(b.is_ok());
    }

    #[tokio::test]
    async fn test_delete_keeps_lock_while_held() {
        let store = InMemorySessionStore::new();
        filled(&store, "s1", 2);

        let guard = store.lock("s1").await;
        store.delete("s1");
        assert!(store.locks.lock().unwrap().contains_key("s1"));

        drop(guard);
        store.delete("s1");
        assert!(!store.locks.lock().unwrap().contains_key("s1"));
    }
}
