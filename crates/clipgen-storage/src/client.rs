//! S3-compatible storage client.

use std::path::Path;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::{Builder, Region};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::error::{StorageError, StorageResult};
use crate::store::{ObjectStore, UploadOptions};

/// Configuration for the storage endpoint and the two buckets the worker uses.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// S3 API endpoint URL
    pub endpoint_url: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    /// Region (usually "auto" for S3-compatible providers)
    pub region: String,
    /// Bucket holding uploaded source videos
    pub videos_bucket: String,
    /// Bucket receiving rendered clips
    pub clips_bucket: String,
}

impl StorageConfig {
    /// Create config from environment variables.
    pub fn from_env() -> StorageResult<Self> {
        fn required(name: &str) -> StorageResult<String> {
            std::env::var(name)
                .ok()
                .filter(|v| !v.is_empty())
                .ok_or_else(|| StorageError::config_error(format!("{} not set", name)))
        }

        Ok(Self {
            endpoint_url: required("STORAGE_ENDPOINT_URL")?,
            access_key_id: required("STORAGE_ACCESS_KEY_ID")?,
            secret_access_key: required("STORAGE_SECRET_ACCESS_KEY")?,
            region: std::env::var("STORAGE_REGION").unwrap_or_else(|_| "auto".to_string()),
            videos_bucket: std::env::var("STORAGE_VIDEOS_BUCKET")
                .unwrap_or_else(|_| "videos".to_string()),
            clips_bucket: std::env::var("STORAGE_CLIPS_BUCKET")
                .unwrap_or_else(|_| "clips".to_string()),
        })
    }

    fn sdk_client(&self) -> Client {
        let credentials = Credentials::new(
            &self.access_key_id,
            &self.secret_access_key,
            None,
            None,
            "clipgen",
        );

        let sdk_config = Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .endpoint_url(&self.endpoint_url)
            .region(Region::new(self.region.clone()))
            .credentials_provider(credentials)
            .force_path_style(true)
            .build();

        Client::from_conf(sdk_config)
    }
}

/// Storage client bound to a single bucket.
#[derive(Clone)]
pub struct StorageClient {
    client: Client,
    bucket: String,
}

impl StorageClient {
    /// Create a client for one bucket.
    pub fn new(config: &StorageConfig, bucket: impl Into<String>) -> Self {
        Self {
            client: config.sdk_client(),
            bucket: bucket.into(),
        }
    }

    /// Clients for the videos and clips buckets, sharing one connection pool.
    pub fn pair_from_config(config: &StorageConfig) -> (Self, Self) {
        let client = config.sdk_client();
        (
            Self {
                client: client.clone(),
                bucket: config.videos_bucket.clone(),
            },
            Self {
                client,
                bucket: config.clips_bucket.clone(),
            },
        )
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

#[async_trait]
impl ObjectStore for StorageClient {
    async fn download_file(&self, key: &str, dest: &Path) -> StorageResult<u64> {
        debug!(bucket = %self.bucket, key = %key, "Downloading {}", dest.display());

        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                let msg = e.to_string();
                let detail = format!("{:?}", e);
                if msg.contains("NoSuchKey") || detail.contains("NoSuchKey") {
                    StorageError::not_found(format!("{}/{}", self.bucket, key))
                } else {
                    StorageError::download_failed(format!("{}/{}: {}", self.bucket, key, msg))
                }
            })?;

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file = tokio::fs::File::create(dest).await?;
        let mut body = response.body;
        let mut written: u64 = 0;

        while let Some(chunk) = body
            .try_next()
            .await
            .map_err(|e| StorageError::download_failed(format!("{}/{}: {}", self.bucket, key, e)))?
        {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        info!(bucket = %self.bucket, key = %key, bytes = written, "Downloaded object");
        Ok(written)
    }

    async fn upload_file(&self, src: &Path, key: &str, options: &UploadOptions) -> StorageResult<()> {
        debug!(bucket = %self.bucket, key = %key, "Uploading {}", src.display());

        let body = ByteStream::from_path(src)
            .await
            .map_err(|e| StorageError::upload_failed(e.to_string()))?;

        let mut request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(body)
            .content_type(&options.content_type);

        if let Some(cache_control) = &options.cache_control {
            request = request.cache_control(cache_control);
        }

        request
            .send()
            .await
            .map_err(|e| StorageError::upload_failed(format!("{}/{}: {}", self.bucket, key, e)))?;

        info!(bucket = %self.bucket, key = %key, "Uploaded {}", src.display());
        Ok(())
    }
}
