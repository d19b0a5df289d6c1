//! Datastore access for the ClipGen worker.
//!
//! This crate provides:
//! - A [`Datastore`] abstraction over table rows with conditional updates
//! - A PostgREST client (Supabase) with retry and metrics
//! - An in-memory datastore with the same semantics, used in tests
//! - Typed repositories for videos, clips and transcripts

pub mod client;
pub mod datastore;
pub mod error;
pub mod memory;
pub mod metrics;
pub mod query;
pub mod repos;
pub mod retry;


pub use client::{SupabaseClient, SupabaseConfig};
pub use datastore::Datastore;
pub use error::{DbError, DbResult};
pub use memory::MemoryDatastore;
pub use query::{Filter, FilterOp, Order, Query};
pub use repos::{ClipRepository, TranscriptRepository, VideoRepository};
pub use retry::RetryConfig;

/// Table names.
pub mod tables {
    pub const JOBS: &str = "jobs";
    pub const VIDEOS: &str = "videos";
    pub const CLIPS: &str = "clips";
    pub const TRANSCRIPTS: &str = "transcripts";
}
