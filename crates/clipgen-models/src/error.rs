//! Model error types.

use thiserror::Error;

pub type ModelResult<T> = Result<T, ModelError>;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Unknown job type: {0}")]
    UnknownJobType(String),

    #[error("Invalid payload for {job_type} job: {message}")]
    InvalidPayload { job_type: String, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ModelError {
    pub fn invalid_payload(job_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidPayload {
            job_type: job_type.into(),
            message: message.into(),
        }
    }
}
