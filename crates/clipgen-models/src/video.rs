//! Video records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Video lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum VideoStatus {
    /// Source uploaded, waiting for transcription
    #[default]
    Uploaded,
    /// Transcription in progress
    Transcribing,
    /// Transcript stored, clips can be requested
    Ready,
    /// Transcription failed permanently
    Error,
}

impl VideoStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VideoStatus::Uploaded => "uploaded",
            VideoStatus::Transcribing => "transcribing",
            VideoStatus::Ready => "ready",
            VideoStatus::Error => "error",
        }
    }
}

impl fmt::Display for VideoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A row of the `videos` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Video {
    pub id: String,
    pub user_id: String,
    /// Original upload filename
    #[serde(default)]
    pub filename: String,
    /// Key of the source object in the videos bucket
    pub storage_path: String,
    /// Probed duration, rounded to whole seconds
    #[serde(default)]
    pub duration_seconds: Option<i64>,
    #[serde(default)]
    pub status: VideoStatus,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Video {
    /// Extension to use for the local download, with leading dot.
    ///
    /// Taken from the upload filename; falls back to `.mp4`.
    pub fn source_extension(&self) -> String {
        Path::new(&self.filename)
            .extension()
            .and_then(|e| e.to_str())
            .filter(|e| !e.is_empty())
            .map(|e| format!(".{}", e.to_ascii_lowercase()))
            .unwrap_or_else(|| ".mp4".to_string())
    }
}
