//! Queue configuration.

use std::time::Duration;

use clipgen_models::JobType;

/// Lease durations per job type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueConfig {
    /// Lease granted to transcription jobs
    pub transcribe_lease: Duration,
    /// Lease granted to clip jobs and to unknown job types
    pub clip_lease: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            transcribe_lease: Duration::from_secs(600), // 10 minutes
            clip_lease: Duration::from_secs(300),       // 5 minutes
        }
    }
}

impl QueueConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            transcribe_lease: env_secs("QUEUE_TRANSCRIBE_LEASE_SECS")
                .unwrap_or(defaults.transcribe_lease),
            clip_lease: env_secs("QUEUE_CLIP_LEASE_SECS").unwrap_or(defaults.clip_lease),
        }
    }

    /// Lease for a raw job type tag.
    pub fn lease_for(&self, job_type: &str) -> Duration {
        match job_type.parse::<JobType>() {
            Ok(JobType::Transcribe) => self.transcribe_lease,
            Ok(JobType::GenerateClip) | Err(_) => self.clip_lease,
        }
    }
}

fn env_secs(key: &str) -> Option<Duration> {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
}
