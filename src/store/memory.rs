//! Process-local object store.

use super::{ObjectStore, StoreError};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
struct StoredObject {
    bytes: Vec<u8>,
    content_type: String,
}

/// `HashMap`-backed [`ObjectStore`] for tests, demos and embedding.
#[derive(Debug, Default)]
pub struct InMemoryObjectStore {
    namespaces: RwLock<HashMap<String, BTreeMap<String, StoredObject>>>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keys present in `namespace`, sorted.
    pub async fn keys(&self, namespace: &str) -> Vec<String> {
        self.namespaces
            .read()
            .await
            .get(namespace)
            .map(|objects| objects.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub async fn content_type(&self, namespace: &str, key: &str) -> Option<String> {
        self.namespaces
            .read()
            .await
            .get(namespace)
            .and_then(|objects| objects.get(key))
            .map(|o| o.content_type.clone())
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn get(&self, namespace: &str, key: &str) -> Result<Vec<u8>, StoreError> {
        self.namespaces
            .read()
            .await
            .get(namespace)
            .and_then(|objects| objects.get(key))
            .map(|o| o.bytes.clone())
            .ok_or_else(|| StoreError::NotFound {
                namespace: namespace.to_string(),
                key: key.to_string(),
            })
    }

    async fn exists(&self, namespace: &str, key: &str) -> Result<bool, StoreError> {
        Ok(self
            .namespaces
            .read()
            .await
            .get(namespace)
            .is_some_and(|objects| objects.contains_key(key)))
    }

    async fn delete(&self, namespace: &str, key: &str) -> Result<(), StoreError> {
        if let Some(objects) = self.namespaces.write().await.get_mut(namespace) {
            objects.remove(key);
        }
        Ok(())
    }

    async fn put(
        &self,
        namespace: &str,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StoreError> {
        self.namespaces
            .write()
            .await
            .entry(namespace.to_string())
            .or_default()
            .insert(
                key.to_string(),
                StoredObject {
                    bytes,
                    content_type: content_type.to_string(),
                },
            );
        Ok(())
    }

    fn location(&self, namespace: &str, key: &str) -> String {
        format!("memory://{namespace}/{key}")
    }
}
