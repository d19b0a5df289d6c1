//! Object storage for source videos and rendered clips.
//!
//! This crate provides:
//! - The [`ObjectStore`] seam used by the job handlers
//! - An S3-compatible client (Supabase Storage, R2, MinIO) bound to one bucket
//! - An in-memory store for tests

pub mod client;
pub mod error;
pub mod memory;
pub mod store;

pub use client::{StorageClient, StorageConfig};
pub use error::{StorageError, StorageResult};
pub use memory::MemoryObjectStore;
pub use store::{ObjectStore, UploadOptions};
