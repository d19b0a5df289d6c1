//! In-memory object store for tests.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{StorageError, StorageResult};
use crate::store::{ObjectStore, UploadOptions};

/// A stored object and the options it was uploaded with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub data: Vec<u8>,
    pub options: UploadOptions,
}

/// Thread-safe map of key to object.
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: Mutex<HashMap<String, StoredObject>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an object directly.
    pub fn put(&self, key: impl Into<String>, data: impl Into<Vec<u8>>) {
        self.lock().insert(
            key.into(),
            StoredObject {
                data: data.into(),
                options: UploadOptions::new("application/octet-stream"),
            },
        );
    }

    pub fn get(&self, key: &str) -> Option<StoredObject> {
        self.lock().get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.lock().keys().cloned().collect();
        keys.sort();
        keys
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, StoredObject>> {
        self.objects.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn download_file(&self, key: &str, dest: &Path) -> StorageResult<u64> {
        let data = self
            .get(key)
            .map(|o| o.data)
            .ok_or_else(|| StorageError::not_found(key))?;

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(dest, &data).await?;
        Ok(data.len() as u64)
    }

    async fn upload_file(&self, src: &Path, key: &str, options: &UploadOptions) -> StorageResult<()> {
        let data = tokio::fs::read(src).await?;
        self.lock().insert(
            key.to_string(),
            StoredObject {
                data,
                options: options.clone(),
            },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_round_trip_through_files() {
        let store = MemoryObjectStore::new();
        store.put("u1/v1.mp4", b"source".to_vec());

        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("nested").join("source.mp4");
        let written = store.download_file("u1/v1.mp4", &local).await.unwrap();
        assert_eq!(written, 6);

        let options = UploadOptions::new("video/mp4").with_cache_control("3600");
        store.upload_file(&local, "u1/c1.mp4", &options).await.unwrap();

        let stored = store.get("u1/c1.mp4").unwrap();
        assert_eq!(stored.data, b"source");
        assert_eq!(stored.options.cache_control.as_deref(), Some("3600"));
    }

    #[tokio::test]
    async fn test_missing_key() {
        let store = MemoryObjectStore::new();
        let dir = tempfile::tempdir().unwrap();
        let err = tokio_test::assert_err!(
            store.download_file("missing", &dir.path().join("x")).await
        );
        assert!(matches!(err, StorageError::NotFound(_)));
    }
}
