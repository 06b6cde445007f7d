//! Object store on the local file system: `{root}/{namespace}/{key}`.
//!
//! Writes go to a temp file in the destination directory and are renamed
//! into place, so a reader never observes a half-written image and a crash
//! mid-write leaves the previous version intact. The content type is not
//! persisted; file extensions carry that information here.

use super::{ObjectStore, StoreError};
use async_trait::async_trait;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct LocalFsObjectStore {
    root: PathBuf,
}

impl LocalFsObjectStore {
    /// Store rooted at `root`, made absolute against the working directory.
    /// The directory is created lazily on first write.
    pub fn new(root: impl AsRef<Path>) -> Result<Self, StoreError> {
        let root = std::path::absolute(root.as_ref())?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, namespace: &str, key: &str) -> Result<PathBuf, StoreError> {
        let mut path = self.root.join(checked_segment(namespace, namespace)?);
        for segment in key.split('/') {
            path.push(checked_segment(key, segment)?);
        }
        Ok(path)
    }
}

/// Reject segments that would leave the namespace directory.
fn checked_segment<'a>(key: &str, segment: &'a str) -> Result<&'a str, StoreError> {
    let bad = |reason: &str| StoreError::InvalidKey {
        key: key.to_string(),
        reason: reason.to_string(),
    };
    match segment {
        "" => Err(bad("empty path segment")),
        "." | ".." => Err(bad("relative path segment")),
        s if s.contains('\\') => Err(bad("platform path separator")),
        s => Ok(s),
    }
}

#[async_trait]
impl ObjectStore for LocalFsObjectStore {
    async fn get(&self, namespace: &str, key: &str) -> Result<Vec<u8>, StoreError> {
        let path = self.path_for(namespace, key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StoreError::NotFound {
                namespace: namespace.to_string(),
                key: key.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, namespace: &str, key: &str) -> Result<bool, StoreError> {
        let path = self.path_for(namespace, key)?;
        Ok(tokio::fs::try_exists(&path).await?)
    }

    async fn delete(&self, namespace: &str, key: &str) -> Result<(), StoreError> {
        let path = self.path_for(namespace, key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn put(
        &self,
        namespace: &str,
        key: &str,
        bytes: Vec<u8>,
        _content_type: &str,
    ) -> Result<(), StoreError> {
        let path = self.path_for(namespace, key)?;
        debug!("Writing {} bytes to {}", bytes.len(), path.display());

        tokio::task::spawn_blocking(move || write_atomically(&path, &bytes))
            .await
            .map_err(|e| StoreError::Transport(format!("Write task panicked: {}", e)))?
    }

    fn location(&self, namespace: &str, key: &str) -> String {
        match self.path_for(namespace, key) {
            Ok(path) => path.display().to_string(),
            Err(_) => format!("{}/{}/{}", self.root.display(), namespace, key),
        }
    }
}

fn write_atomically(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let parent = path
        .parent()
        .ok_or_else(|| StoreError::InvalidKey {
            key: path.display().to_string(),
            reason: "no parent directory".into(),
        })?;
    std::fs::create_dir_all(parent)?;

    let mut tmp = NamedTempFile::new_in(parent)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| StoreError::Io(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn round_trip_nested_key() {
        let dir = TempDir::new().unwrap();
        let store = LocalFsObjectStore::new(dir.path()).unwrap();

        store
            .put("intake", "reports/q1.pdf", b"%PDF-1.4".to_vec(), "application/pdf")
            .await
            .unwrap();

        assert!(dir.path().join("intake/reports/q1.pdf").is_file());
        assert!(store.exists("intake", "reports/q1.pdf").await.unwrap());
        assert_eq!(
            store.get("intake", "reports/q1.pdf").await.unwrap(),
            b"%PDF-1.4"
        );
    }

    #[tokio::test]
    async fn missing_object_is_not_found() {
        let dir = TempDir::new().unwrap();
        let store = LocalFsObjectStore::new(dir.path()).unwrap();
        assert!(matches!(
            store.get("intake", "absent.pdf").await,
            Err(StoreError::NotFound { .. })
        ));
        assert!(!store.exists("intake", "absent.pdf").await.unwrap());
    }

    #[tokio::test]
    async fn delete_absent_is_ok() {
        let dir = TempDir::new().unwrap();
        let store = LocalFsObjectStore::new(dir.path()).unwrap();
        store.delete("output", "x-001.jpg").await.unwrap();

        store.put("output", "x-001.jpg", vec![1], "image/jpeg").await.unwrap();
        store.delete("output", "x-001.jpg").await.unwrap();
        assert!(!store.exists("output", "x-001.jpg").await.unwrap());
    }

    #[tokio::test]
    async fn overwrite_leaves_no_temp_files() {
        let dir = TempDir::new().unwrap();
        let store = LocalFsObjectStore::new(dir.path()).unwrap();
        store.put("output", "a.jpg", vec![1, 1], "image/jpeg").await.unwrap();
        store.put("output", "a.jpg", vec![2], "image/jpeg").await.unwrap();

        assert_eq!(store.get("output", "a.jpg").await.unwrap(), vec![2]);
        let entries: Vec<_> = std::fs::read_dir(dir.path().join("output"))
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries.len(), 1, "got: {entries:?}");
    }

    #[tokio::test]
    async fn traversal_keys_are_rejected() {
        let dir = TempDir::new().unwrap();
        let store = LocalFsObjectStore::new(dir.path()).unwrap();
        for key in ["../escape.pdf", "a/../../b", "a//b", "c:\\x"] {
            assert!(
                matches!(
                    store.get("intake", key).await,
                    Err(StoreError::InvalidKey { .. })
                ),
                "key {key:?} should be rejected"
            );
        }
        assert!(matches!(
            store.put("..", "a.jpg", vec![], "image/jpeg").await,
            Err(StoreError::InvalidKey { .. })
        ));
    }

    #[test]
    fn location_is_absolute_path() {
        let dir = TempDir::new().unwrap();
        let store = LocalFsObjectStore::new(dir.path()).unwrap();
        let loc = store.location("output", "r-001.jpg");
        assert!(Path::new(&loc).is_absolute(), "got: {loc}");
        assert!(loc.ends_with("r-001.jpg"));
    }
}
