//! Transcription and clip generation worker.
//!
//! This crate provides:
//! - The polling job executor with lease recovery
//! - The transcription job
//! - The clip generation job
//! - Structured job logging and Prometheus metrics

pub mod clip_job;
pub mod config;
pub mod context;
pub mod error;
pub mod executor;
pub mod logging;
pub mod metrics;
pub mod transcribe_job;

pub use clip_job::ClipOutcome;
pub use config::{CaptionConfig, WorkerConfig};
pub use context::JobContext;
pub use error::{WorkerError, WorkerResult};
pub use executor::{Dependent, JobExecutor};
pub use logging::JobLogger;
pub use transcribe_job::TranscribeOutcome;
