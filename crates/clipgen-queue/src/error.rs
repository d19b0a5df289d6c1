//! Queue error types.

use thiserror::Error;

use clipgen_db::DbError;

pub type QueueResult<T> = Result<T, QueueError>;

#[derive(Debug, Error)]
pub enum QueueError {
    /// The job was recovered or re-claimed since this worker claimed it.
    #[error("Lease lost for job {0}")]
    LeaseLost(String),

    /// A pending row that cannot be decoded and has no id to quarantine it by.
    #[error("Malformed job row: {0}")]
    MalformedRow(String),

    #[error("Datastore error: {0}")]
    Db(#[from] DbError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl QueueError {
    pub fn lease_lost(job_id: impl Into<String>) -> Self {
        Self::LeaseLost(job_id.into())
    }

    pub fn is_lease_lost(&self) -> bool {
        matches!(self, QueueError::LeaseLost(_))
    }
}
