//! Shared services handed to every job.

use std::sync::Arc;

use tempfile::TempDir;
use tracing::info;

use clipgen_db::{
    ClipRepository, Datastore, SupabaseClient, SupabaseConfig, TranscriptRepository,
    VideoRepository,
};
use clipgen_media::{FfmpegToolkit, MediaToolkit};
use clipgen_queue::{JobQueue, QueueConfig};
use clipgen_storage::{ObjectStore, StorageClient, StorageConfig};
use clipgen_stt::{SpeechToText, WhisperClient};

use crate::config::WorkerConfig;
use crate::error::WorkerResult;

/// Clients and configuration used by the job handlers.
pub struct JobContext {
    pub config: WorkerConfig,
    pub queue: JobQueue,
    pub videos: VideoRepository,
    pub clips: ClipRepository,
    pub transcripts: TranscriptRepository,
    /// Bucket holding uploaded source videos
    pub video_store: Arc<dyn ObjectStore>,
    /// Bucket receiving rendered clips
    pub clip_store: Arc<dyn ObjectStore>,
    pub stt: Arc<dyn SpeechToText>,
    pub media: Arc<dyn MediaToolkit>,
}

impl JobContext {
    pub fn new(
        config: WorkerConfig,
        queue_config: QueueConfig,
        db: Arc<dyn Datastore>,
        video_store: Arc<dyn ObjectStore>,
        clip_store: Arc<dyn ObjectStore>,
        stt: Arc<dyn SpeechToText>,
        media: Arc<dyn MediaToolkit>,
    ) -> Self {
        Self {
            config,
            queue: JobQueue::new(Arc::clone(&db), queue_config),
            videos: VideoRepository::new(Arc::clone(&db)),
            clips: ClipRepository::new(Arc::clone(&db)),
            transcripts: TranscriptRepository::new(db),
            video_store,
            clip_store,
            stt,
            media,
        }
    }

    /// Build production clients from environment variables.
    pub fn from_env(config: WorkerConfig) -> WorkerResult<Self> {
        let db: Arc<dyn Datastore> = Arc::new(SupabaseClient::new(SupabaseConfig::from_env()?)?);

        let storage_config = StorageConfig::from_env()?;
        let (video_store, clip_store) = StorageClient::pair_from_config(&storage_config);
        info!(
            videos_bucket = %video_store.bucket(),
            clips_bucket = %clip_store.bucket(),
            "Storage configured"
        );

        let stt = WhisperClient::from_env()?;

        Ok(Self::new(
            config,
            QueueConfig::from_env(),
            db,
            Arc::new(video_store),
            Arc::new(clip_store),
            Arc::new(stt),
            Arc::new(FfmpegToolkit::from_env()),
        ))
    }

    /// Create a private scratch directory, removed when the guard drops.
    pub async fn scratch_dir(&self) -> WorkerResult<TempDir> {
        tokio::fs::create_dir_all(&self.config.work_dir).await?;
        let dir = tempfile::Builder::new()
            .prefix("job-")
            .tempdir_in(&self.config.work_dir)?;
        Ok(dir)
    }
}
