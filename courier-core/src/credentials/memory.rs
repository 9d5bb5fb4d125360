//! In-memory credential store

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{CredentialStore, Credentials};
use crate::error::CredentialError;

/// Credential store that lives only as long as the process
#[derive(Default)]
pub struct MemoryCredentialStore {
    entries: RwLock<HashMap<String, Credentials>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether anything is stored for the session
    pub async fn contains(&self, session_id: &str) -> bool {
        self.entries.read().await.contains_key(session_id)
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn load(&self, session_id: &str) -> Result<Option<Credentials>, CredentialError> {
        Ok(self.entries.read().await.get(session_id).cloned())
    }

    async fn save(
        &self,
        session_id: &str,
        credentials: &Credentials,
    ) -> Result<(), CredentialError> {
        self.entries
            .write()
            .await
            .insert(session_id.to_string(), credentials.clone());
        Ok(())
    }

    async fn remove(&self, session_id: &str) -> Result<(), CredentialError> {
        self.entries.write().await.remove(session_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn save_then_load() {
        let store = MemoryCredentialStore::new();
        let creds = Credentials::new(serde_json::json!({"k": 1}));

        store.save("s1", &creds).await.unwrap();

        assert_eq!(store.load("s1").await.unwrap(), Some(creds));
        assert!(store.load("s2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let store = MemoryCredentialStore::new();
        store
            .save("s1", &Credentials::new(serde_json::json!({})))
            .await
            .unwrap();

        store.remove("s1").await.unwrap();
        store.remove("s1").await.unwrap();

        assert!(!store.contains("s1").await);
    }
}
