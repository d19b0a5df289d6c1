//! Job rows, typed job payloads and processing progress.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{ModelError, ModelResult};

/// Default retry budget for jobs created without an explicit one.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Per-claim lease token written into the job row at claim time.
///
/// Completion and failure writes are conditioned on the token still matching,
/// so an execution whose lease was recovered cannot overwrite a newer claim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LeaseId(pub String);

impl LeaseId {
    /// Generate a new random lease token.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for LeaseId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for LeaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Job status as stored in the `jobs` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Waiting to be claimed
    #[default]
    Pending,
    /// Leased by a worker
    Processing,
    /// Finished successfully
    Completed,
    /// Retries exhausted
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    /// Check if this is a terminal state (no more automatic transitions).
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Type of job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    /// Transcribe an uploaded video
    Transcribe,
    /// Render one captioned vertical clip
    GenerateClip,
}

impl JobType {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::Transcribe => "transcribe",
            JobType::GenerateClip => "generate_clip",
        }
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for JobType {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "transcribe" => Ok(JobType::Transcribe),
            "generate_clip" => Ok(JobType::GenerateClip),
            other => Err(ModelError::UnknownJobType(other.to_string())),
        }
    }
}

/// Pipeline stage reported through `processing_progress`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Starting,
    DownloadingVideo,
    ExtractingAudio,
    Transcribing,
    GeneratingClip,
    Uploading,
    Done,
    Error,
    Timeout,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Starting => "starting",
            Stage::DownloadingVideo => "downloading_video",
            Stage::ExtractingAudio => "extracting_audio",
            Stage::Transcribing => "transcribing",
            Stage::GeneratingClip => "generating_clip",
            Stage::Uploading => "uploading",
            Stage::Done => "done",
            Stage::Error => "error",
            Stage::Timeout => "timeout",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Observability-only progress marker. Never used for correctness.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingProgress {
    pub stage: Stage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percent: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ProcessingProgress {
    pub fn new(stage: Stage) -> Self {
        Self {
            stage,
            percent: None,
            message: None,
        }
    }

    pub fn with_percent(mut self, percent: u8) -> Self {
        self.percent = Some(percent.min(100));
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// A row of the `jobs` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: String,

    /// Raw type tag; decoded together with `payload` by [`Job::task`].
    #[serde(rename = "type")]
    pub job_type: String,

    #[serde(default)]
    pub payload: Value,

    #[serde(default)]
    pub status: JobStatus,

    #[serde(default)]
    pub result: Option<Value>,

    #[serde(default)]
    pub error: Option<String>,

    #[serde(default, deserialize_with = "attempts_or_zero")]
    pub attempts: u32,

    #[serde(default = "default_max_attempts", deserialize_with = "max_attempts_or_default")]
    pub max_attempts: u32,

    #[serde(default)]
    pub processing_progress: Option<ProcessingProgress>,

    #[serde(default)]
    pub timeout_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub lease_id: Option<LeaseId>,

    pub created_at: DateTime<Utc>,

    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

// Rows written outside this worker may carry explicit NULL counters.
fn attempts_or_zero<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    Ok(Option::<u32>::deserialize(deserializer)?.unwrap_or(0))
}

fn max_attempts_or_default<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    Ok(Option::<u32>::deserialize(deserializer)?.unwrap_or(DEFAULT_MAX_ATTEMPTS))
}

impl Job {
    /// Parsed job type, if the tag is one this worker knows.
    pub fn kind(&self) -> Option<JobType> {
        self.job_type.parse().ok()
    }

    /// True once the attempts counter has reached the retry budget.
    pub fn is_exhausted(&self) -> bool {
        self.attempts >= self.max_attempts
    }

    /// Decode the untyped payload into a typed task.
    pub fn task(&self) -> ModelResult<JobTask> {
        JobTask::decode(&self.job_type, &self.payload)
    }
}

/// Payload of a `transcribe` job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscribePayload {
    pub video_id: String,
}

/// Payload of a `generate_clip` job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateClipPayload {
    pub video_id: String,
    pub clip_id: String,
    /// Window start in seconds
    pub start: f64,
    /// Window end in seconds (exclusive)
    pub end: f64,
}

/// Typed job payload, keyed by job type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum JobTask {
    Transcribe(TranscribePayload),
    GenerateClip(GenerateClipPayload),
}

impl JobTask {
    /// Decode a `(type, payload)` pair as stored in a job row.
    pub fn decode(job_type: &str, payload: &Value) -> ModelResult<Self> {
        let kind: JobType = job_type.parse()?;

        let task: JobTask = serde_json::from_value(json!({
            "type": kind.as_str(),
            "payload": payload,
        }))
        .map_err(|e| ModelError::invalid_payload(kind.as_str(), e.to_string()))?;

        task.validate()?;
        Ok(task)
    }

    /// Split into the `(type, payload)` columns of a job row.
    pub fn into_parts(self) -> (JobType, Value) {
        let kind = self.job_type();
        let payload = match self {
            JobTask::Transcribe(p) => serde_json::to_value(p),
            JobTask::GenerateClip(p) => serde_json::to_value(p),
        }
        .unwrap_or(Value::Null);
        (kind, payload)
    }

    pub fn job_type(&self) -> JobType {
        match self {
            JobTask::Transcribe(_) => JobType::Transcribe,
            JobTask::GenerateClip(_) => JobType::GenerateClip,
        }
    }

    fn validate(&self) -> ModelResult<()> {
        if let JobTask::GenerateClip(p) = self {
            if !p.start.is_finite() || !p.end.is_finite() || p.start < 0.0 {
                return Err(ModelError::invalid_payload(
                    JobType::GenerateClip.as_str(),
                    format!("invalid clip start {}", p.start),
                ));
            }
            if p.end <= p.start {
                return Err(ModelError::invalid_payload(
                    JobType::GenerateClip.as_str(),
                    format!("clip end {} must be after start {}", p.end, p.start),
                ));
            }
        }
        Ok(())
    }
}
