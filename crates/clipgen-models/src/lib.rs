//! Shared data models for the ClipGen worker.
//!
//! This crate provides Serde-serializable types for:
//! - Jobs, their typed payloads and processing progress
//! - Videos, clips and transcripts as stored in the datastore
//! - Speech-to-text responses
//! - Encoding configuration for rendered clips

pub mod clip;
pub mod encoding;
pub mod error;
pub mod job;
pub mod transcript;
pub mod video;

// Re-export common types
pub use clip::{Clip, ClipStatus};
pub use encoding::EncodingConfig;
pub use error::{ModelError, ModelResult};
pub use job::{
    GenerateClipPayload, Job, JobStatus, JobTask, JobType, LeaseId, ProcessingProgress, Stage,
    TranscribePayload, DEFAULT_MAX_ATTEMPTS,
};
pub use transcript::{
    NewTranscript, ResponseSegment, TimedWord, Transcript, TranscriptSegment,
    TranscriptionResponse,
};
pub use video::{Video, VideoStatus};
