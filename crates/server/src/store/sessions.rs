use std::collections::HashMap;
use std::sync::Arc;

use puzzle_core::TrainingSession;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

pub type SharedSession = Arc<Mutex<TrainingSession>>;

/// Training sessions keyed by their opaque token.
///
/// Entries live until the process exits; nothing expires idle sessions.
#[derive(Clone, Default)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, SharedSession>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an idle session under a fresh random token.
    pub async fn create(&self) -> (String, SharedSession) {
        let mut sessions = self.sessions.write().await;
        let token = loop {
            let candidate = Uuid::new_v4().simple().to_string();
            if !sessions.contains_key(&candidate) {
                break candidate;
            }
        };
        let session = Arc::new(Mutex::new(TrainingSession::new(token.clone())));
        sessions.insert(token.clone(), session.clone());
        tracing::debug!(session_id = %token, "Training session created");
        (token, session)
    }

    pub async fn get(&self, token: &str) -> Option<SharedSession> {
        self.sessions.read().await.get(token).cloned()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use puzzle_core::SessionState;

    #[tokio::test]
    async fn test_create_and_get() {
        let store = SessionStore::new();
        assert!(store.is_empty().await);

        let (token, session) = store.create().await;
        assert_eq!(token.len(), 32);
        assert_eq!(session.lock().await.session_id(), token);

        let fetched = store.get(&token).await.unwrap();
        assert!(Arc::ptr_eq(&fetched, &session));
        assert_eq!(fetched.lock().await.state(), SessionState::Idle);
        assert!(store.get("missing").await.is_none());
    }

    #[tokio::test]
    async fn test_tokens_are_unique() {
        let store = SessionStore::new();
        let (a, _) = store.create().await;
        let (b, _) = store.create().await;
        assert_ne!(a, b);
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_one_session_is_serialized() {
        let store = SessionStore::new();
        let (token, _) = store.create().await;

        let first = store.get(&token).await.unwrap();
        let guard = first.lock().await;
        let second = store.get(&token).await.unwrap();
        assert!(second.try_lock().is_err());
        drop(guard);
        assert!(second.try_lock().is_ok());
    }
}
