//! The object store seam.

use std::path::Path;

use async_trait::async_trait;

use crate::error::StorageResult;

/// Metadata attached to an uploaded object.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UploadOptions {
    pub content_type: String,
    /// Cache-Control header value, e.g. `max-age=3600`
    pub cache_control: Option<String>,
}

impl UploadOptions {
    pub fn new(content_type: impl Into<String>) -> Self {
        Self {
            content_type: content_type.into(),
            cache_control: None,
        }
    }

    pub fn with_cache_control(mut self, cache_control: impl Into<String>) -> Self {
        self.cache_control = Some(cache_control.into());
        self
    }
}

/// A single bucket of objects addressed by key.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Download an object to a local file; returns bytes written.
    async fn download_file(&self, key: &str, dest: &Path) -> StorageResult<u64>;

    /// Upload a local file under `key`, replacing any existing object.
    async fn upload_file(&self, src: &Path, key: &str, options: &UploadOptions) -> StorageResult<()>;
}
