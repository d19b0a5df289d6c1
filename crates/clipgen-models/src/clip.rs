//! Clip records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Clip lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ClipStatus {
    #[default]
    Pending,
    Processing,
    Ready,
    Error,
}

impl ClipStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClipStatus::Pending => "pending",
            ClipStatus::Processing => "processing",
            ClipStatus::Ready => "ready",
            ClipStatus::Error => "error",
        }
    }
}

impl fmt::Display for ClipStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A row of the `clips` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Clip {
    pub id: String,
    pub video_id: String,
    pub user_id: String,
    pub start_time: f64,
    pub end_time: f64,
    /// Key of the rendered object in the clips bucket; set only when ready
    #[serde(default)]
    pub storage_path: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub status: ClipStatus,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Clip {
    /// Object key for a rendered clip: `{user_id}/{clip_id}.mp4`.
    pub fn object_key(user_id: &str, clip_id: &str) -> String {
        format!("{}/{}.mp4", user_id, clip_id)
    }

    /// A ready clip must carry a storage location.
    pub fn is_consistent(&self) -> bool {
        match self.status {
            ClipStatus::Ready => self.storage_path.is_some(),
            _ => true,
        }
    }
}
