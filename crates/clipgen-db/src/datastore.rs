//! The datastore seam used by the queue and the job handlers.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::DbResult;
use crate::query::{Filter, Query};

/// Row-oriented datastore with conditional updates.
///
/// `update` applies the patch only to rows matching every filter and returns
/// the rows it changed. The match-and-write is atomic per row, so a filter on
/// an expected current value acts as a compare-and-swap: an empty result means
/// another writer got there first.
#[async_trait]
pub trait Datastore: Send + Sync {
    /// Select rows matching the query.
    async fn select(&self, table: &str, query: &Query) -> DbResult<Vec<Value>>;

    /// Insert one row and return it as stored.
    async fn insert(&self, table: &str, row: Value) -> DbResult<Value>;

    /// Conditionally update rows; returns the updated rows.
    async fn update(&self, table: &str, filters: &[Filter], patch: Value) -> DbResult<Vec<Value>>;
}
