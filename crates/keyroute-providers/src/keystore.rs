//! In-memory `UserKeyStore`, for tests and single-process deployments.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use keyroute_core::{EndpointId, ResolveError};

use crate::traits::{StoredUserKey, UserKeyStore};

/// Keys held in a map keyed by `(user id, endpoint)`.
#[derive(Debug, Default)]
pub struct MemoryKeyStore {
    keys: RwLock<HashMap<(String, EndpointId), StoredUserKey>>,
}

impl MemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store (or replace) a user's key for an endpoint.
    pub async fn insert(&self, user_id: impl Into<String>, endpoint: EndpointId, key: StoredUserKey) {
        let user_id = user_id.into();
        debug!(user = %user_id, endpoint = %endpoint, "Storing user key");
        self.keys.write().await.insert((user_id, endpoint), key);
    }

    /// Remove a user's key. Returns whether one was present.
    pub async fn remove(&self, user_id: &str, endpoint: EndpointId) -> bool {
        self.keys
            .write()
            .await
            .remove(&(user_id.to_string(), endpoint))
            .is_some()
    }
}

#[async_trait]
impl UserKeyStore for MemoryKeyStore {
    async fn get_user_key(
        &self,
        user_id: &str,
        endpoint: EndpointId,
    ) -> Result<Option<StoredUserKey>, ResolveError> {
        Ok(self
            .keys
            .read()
            .await
            .get(&(user_id.to_string(), endpoint))
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::UserKeyValues;

    fn key(value: &str) -> StoredUserKey {
        StoredUserKey {
            values: UserKeyValues {
                api_key: value.to_string(),
                base_url: None,
            },
            expires_at: None,
        }
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let store = MemoryKeyStore::new();
        store.insert("u1", EndpointId::OpenAi, key("sk-user")).await;

        let found = store.get_user_key("u1", EndpointId::OpenAi).await.unwrap();
        assert_eq!(found.unwrap().values.api_key, "sk-user");
    }

    #[tokio::test]
    async fn test_keys_are_scoped_per_endpoint_and_user() {
        let store = MemoryKeyStore::new();
        store.insert("u1", EndpointId::OpenAi, key("sk-user")).await;

        assert!(store.get_user_key("u1", EndpointId::Anthropic).await.unwrap().is_none());
        assert!(store.get_user_key("u2", EndpointId::OpenAi).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_remove() {
        let store = MemoryKeyStore::new();
        store.insert("u1", EndpointId::Google, key("g")).await;
        assert!(store.remove("u1", EndpointId::Google).await);
        assert!(!store.remove("u1", EndpointId::Google).await);
    }
}
