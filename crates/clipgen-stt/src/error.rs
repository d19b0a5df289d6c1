//! Speech-to-text error types.

use thiserror::Error;

pub type SttResult<T> = Result<T, SttError>;

#[derive(Debug, Error)]
pub enum SttError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Audio file too large for transcription: {size} bytes (max {max})")]
    FileTooLarge { size: u64, max: u64 },

    #[error("Transcription API returned {status}: {body}")]
    RequestFailed { status: u16, body: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SttError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            SttError::RequestFailed { status, .. } => *status == 429 || *status >= 500,
            SttError::Network(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            _ => false,
        }
    }
}
