//! Worker error types.

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Video not found: {0}")]
    VideoNotFound(String),

    #[error("Video too long: {duration:.0}s exceeds the {max}s limit")]
    DurationExceeded { duration: f64, max: u64 },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid job: {0}")]
    Model(#[from] clipgen_models::ModelError),

    #[error("Datastore error: {0}")]
    Db(#[from] clipgen_db::DbError),

    #[error("Storage error: {0}")]
    Storage(#[from] clipgen_storage::StorageError),

    #[error("Transcription error: {0}")]
    Stt(#[from] clipgen_stt::SttError),

    #[error("Media error: {0}")]
    Media(#[from] clipgen_media::MediaError),

    #[error("Queue error: {0}")]
    Queue(#[from] clipgen_queue::QueueError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl WorkerError {
    pub fn video_not_found(video_id: impl Into<String>) -> Self {
        Self::VideoNotFound(video_id.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}
