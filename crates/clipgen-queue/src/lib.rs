//! Lease-based job queue backed by the `jobs` table.
//!
//! This crate provides:
//! - Claiming the oldest pending job with a conditional update
//! - Lease tokens that fence completion and failure writes
//! - Recovery of jobs whose lease deadline passed

pub mod config;
pub mod error;
pub mod queue;

pub use config::QueueConfig;
pub use error::{QueueError, QueueResult};
pub use queue::{FailOutcome, JobQueue, Recovered};
