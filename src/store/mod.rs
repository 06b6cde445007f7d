//! Object store contract consumed by the splitter, plus its adapters.
//!
//! The splitter only ever needs five things from a store: read a whole
//! object, ask whether one exists, delete one (absent is fine), write one,
//! and name where an object lives. [`ObjectStore`] is exactly that surface.
//! Per-key atomicity is the backend's business.
//!
//! | Adapter | Backing | Location format |
//! |---------|---------|-----------------|
//! | [`InMemoryObjectStore`] | `HashMap` | `memory://{namespace}/{key}` |
//! | [`LocalFsObjectStore`] | `{root}/{namespace}/{key}` | absolute file path |
//! | [`AzureBlobStore`] | `object_store` Azure client, account key or SAS | blob URL |
//!
//! Adapters are built from a [`StoreConfig`] by [`open_store`]; credentials
//! enter through that config and nowhere else.

pub mod azure;
pub mod fs;
pub mod memory;

pub use azure::{AzureBlobStore, AzureCredential, AzureSettings};
pub use fs::LocalFsObjectStore;
pub use memory::InMemoryObjectStore;

use async_trait::async_trait;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Failure of a single store call.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("object '{namespace}/{key}' not found")]
    NotFound { namespace: String, key: String },

    #[error("key '{key}' rejected: {reason}")]
    InvalidKey { key: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("backend error: {0}")]
    Backend(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("invalid store configuration: {0}")]
    InvalidConfig(String),
}

/// Namespaced key/value object storage.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Full content of the object; [`StoreError::NotFound`] if absent.
    async fn get(&self, namespace: &str, key: &str) -> Result<Vec<u8>, StoreError>;

    async fn exists(&self, namespace: &str, key: &str) -> Result<bool, StoreError>;

    /// Remove the object. Succeeds when it is already absent.
    async fn delete(&self, namespace: &str, key: &str) -> Result<(), StoreError>;

    async fn put(
        &self,
        namespace: &str,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StoreError>;

    /// Durable identity of the object at `namespace/key`.
    fn location(&self, namespace: &str, key: &str) -> String;
}

/// Which store adapter to build, and its settings.
#[derive(Clone, PartialEq, Eq)]
pub enum StoreConfig {
    /// Process-local map; contents vanish with the process.
    Memory,
    /// One directory per namespace under `root`.
    LocalFs { root: PathBuf },
    /// Azure Blob Storage; one container per namespace.
    AzureBlob { connection_string: String },
}

impl fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreConfig::Memory => f.write_str("Memory"),
            StoreConfig::LocalFs { root } => {
                f.debug_struct("LocalFs").field("root", root).finish()
            }
            StoreConfig::AzureBlob { .. } => f
                .debug_struct("AzureBlob")
                .field("connection_string", &"<redacted>")
                .finish(),
        }
    }
}

/// Build the adapter described by `config`.
pub fn open_store(config: &StoreConfig) -> Result<Arc<dyn ObjectStore>, StoreError> {
    Ok(match config {
        StoreConfig::Memory => Arc::new(InMemoryObjectStore::new()),
        StoreConfig::LocalFs { root } => Arc::new(LocalFsObjectStore::new(root)?),
        StoreConfig::AzureBlob { connection_string } => {
            Arc::new(AzureBlobStore::from_connection_string(connection_string)?)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_redacts_connection_string() {
        let c = StoreConfig::AzureBlob {
            connection_string: "BlobEndpoint=https://x;SharedAccessSignature=sig=secret".into(),
        };
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("secret"), "got: {dbg}");
    }

    #[tokio::test]
    async fn open_memory_store() {
        let store = open_store(&StoreConfig::Memory).unwrap();
        store
            .put("output", "a-001.jpg", vec![1, 2, 3], "image/jpeg")
            .await
            .unwrap();
        assert_eq!(store.get("output", "a-001.jpg").await.unwrap(), vec![1, 2, 3]);
        assert_eq!(store.location("output", "a-001.jpg"), "memory://output/a-001.jpg");
    }

    #[test]
    fn open_azure_accepts_account_key() {
        let c = StoreConfig::AzureBlob {
            connection_string: "DefaultEndpointsProtocol=https;AccountName=healthrec;AccountKey=bXlrZXk=;EndpointSuffix=core.windows.net".into(),
        };
        let store = open_store(&c).unwrap();
        assert_eq!(
            store.location("output", "r-001.jpg"),
            "https://healthrec.blob.core.windows.net/output/r-001.jpg"
        );
    }

    #[test]
    fn open_azure_rejects_missing_credentials() {
        let c = StoreConfig::AzureBlob {
            connection_string: "AccountName=healthrec;EndpointSuffix=core.windows.net".into(),
        };
        assert!(matches!(open_store(&c), Err(StoreError::InvalidConfig(_))));
    }
}
