//! In-memory session registry.
//!
//! One `UserSession` per browser session, each behind its own async mutex.
//! Handlers hold the mutex for the whole interaction, so interactions on a
//! single session are serialized the way the original single-threaded UI
//! serialized its re-runs. Nothing survives a process restart.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::info;
use uuid::Uuid;

use super::UserSession;

pub type SharedSession = Arc<Mutex<UserSession>>;

#[derive(Clone, Default)]
pub struct SessionStore {
    inner: Arc<RwLock<HashMap<Uuid, SharedSession>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn create(&self) -> Uuid {
        let id = Uuid::new_v4();
        let session = Arc::new(Mutex::new(UserSession::new(id)));
        self.inner.write().await.insert(id, session);
        info!("Session {id} created");
        id
    }

    pub async fn get(&self, id: Uuid) -> Option<SharedSession> {
        self.inner.read().await.get(&id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_then_get_returns_the_same_session() {
        let store = SessionStore::new();
        let id = store.create().await;

        let session = store.get(id).await.expect("session should exist");
        let session = session.lock().await;
        assert_eq!(session.id, id);
        assert!(!session.has_document());
    }

    #[tokio::test]
    async fn test_get_unknown_id_is_none() {
        let store = SessionStore::new();
        assert!(store.get(Uuid::new_v4()).await.is_none());
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let store = SessionStore::new();
        let a = store.create().await;
        let b = store.create().await;

        {
            let sa = store.get(a).await.unwrap();
            sa.lock().await.job_description = "role A".to_string();
        }

        let sb = store.get(b).await.unwrap();
        assert!(sb.lock().await.job_description.is_empty());
    }
}
