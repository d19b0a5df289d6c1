//! In-memory datastore.
//!
//! Mirrors the PostgREST semantics the worker relies on: equality, less-than
//! and null filters, ordering, limits and atomic conditional updates. Rows are
//! plain JSON objects; `id` and `created_at` are filled in on insert when
//! absent.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::datastore::Datastore;
use crate::error::{DbError, DbResult};
use crate::query::{Filter, FilterOp, Order, Query};

/// Thread-safe in-memory table store.
#[derive(Debug, Default)]
pub struct MemoryDatastore {
    tables: Mutex<HashMap<String, Vec<Map<String, Value>>>>,
}

impl MemoryDatastore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every row in a table, in insertion order.
    pub fn rows(&self, table: &str) -> Vec<Value> {
        self.lock()
            .get(table)
            .map(|rows| rows.iter().cloned().map(Value::Object).collect())
            .unwrap_or_default()
    }

    /// Fetch one row by id.
    pub fn row(&self, table: &str, id: &str) -> Option<Value> {
        self.lock().get(table).and_then(|rows| {
            rows.iter()
                .find(|r| r.get("id").and_then(Value::as_str) == Some(id))
                .cloned()
                .map(Value::Object)
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Vec<Map<String, Value>>>> {
        // A poisoned lock only means a test panicked mid-write; the data is still usable.
        self.tables.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl Datastore for MemoryDatastore {
    async fn select(&self, table: &str, query: &Query) -> DbResult<Vec<Value>> {
        let tables = self.lock();
        let mut rows: Vec<&Map<String, Value>> = tables
            .get(table)
            .map(|rows| rows.iter().filter(|r| matches_all(r, &query.filters)).collect())
            .unwrap_or_default();

        if let Some((column, order)) = &query.order {
            rows.sort_by(|a, b| {
                let ord = compare_values(
                    a.get(column).unwrap_or(&Value::Null),
                    b.get(column).unwrap_or(&Value::Null),
                )
                .unwrap_or(Ordering::Equal);
                match order {
                    Order::Asc => ord,
                    Order::Desc => ord.reverse(),
                }
            });
        }

        let limit = query.limit.unwrap_or(usize::MAX);
        Ok(rows
            .into_iter()
            .take(limit)
            .cloned()
            .map(Value::Object)
            .collect())
    }

    async fn insert(&self, table: &str, row: Value) -> DbResult<Value> {
        let Value::Object(mut row) = row else {
            return Err(DbError::request_failed(format!(
                "insert into {} expects a JSON object",
                table
            )));
        };

        row.entry("id")
            .or_insert_with(|| Value::String(Uuid::new_v4().to_string()));
        row.entry("created_at")
            .or_insert_with(|| Value::String(Utc::now().to_rfc3339()));

        let mut tables = self.lock();
        let rows = tables.entry(table.to_string()).or_default();
        if rows.iter().any(|r| r.get("id") == row.get("id")) {
            return Err(DbError::Conflict(format!("duplicate id in {}", table)));
        }
        rows.push(row.clone());
        Ok(Value::Object(row))
    }

    async fn update(&self, table: &str, filters: &[Filter], patch: Value) -> DbResult<Vec<Value>> {
        if filters.is_empty() {
            return Err(DbError::request_failed(format!(
                "refusing unfiltered update of {}",
                table
            )));
        }
        let Value::Object(patch) = patch else {
            return Err(DbError::request_failed(format!(
                "update of {} expects a JSON object",
                table
            )));
        };

        let mut tables = self.lock();
        let Some(rows) = tables.get_mut(table) else {
            return Ok(Vec::new());
        };

        let mut updated = Vec::new();
        for row in rows.iter_mut().filter(|r| matches_all(r, filters)) {
            for (key, value) in &patch {
                row.insert(key.clone(), value.clone());
            }
            updated.push(Value::Object(row.clone()));
        }
        Ok(updated)
    }
}

fn matches_all(row: &Map<String, Value>, filters: &[Filter]) -> bool {
    filters.iter().all(|f| {
        let actual = row.get(&f.column).unwrap_or(&Value::Null);
        match f.op {
            FilterOp::IsNull => actual.is_null(),
            // SQL semantics: comparisons against NULL never match
            FilterOp::Eq => compare_values(actual, &f.value) == Some(Ordering::Equal),
            FilterOp::Lt => compare_values(actual, &f.value) == Some(Ordering::Less),
        }
    })
}

/// Compare two JSON scalars the way Postgres compares the column types we use.
fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Null, _) | (_, Value::Null) => None,
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::String(x), Value::String(y)) => match (parse_time(x), parse_time(y)) {
            (Some(tx), Some(ty)) => Some(tx.cmp(&ty)),
            _ => Some(x.cmp(y)),
        },
        _ => None,
    }
}

fn parse_time(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_insert_assigns_id_and_created_at() {
        let db = MemoryDatastore::new();
        let row = db.insert("videos", json!({ "status": "uploaded" })).await.unwrap();
        assert!(row["id"].is_string());
        assert!(row["created_at"].is_string());
        assert_eq!(db.rows("videos").len(), 1);
    }

    #[tokio::test]
    async fn test_select_filters_orders_and_limits() {
        let db = MemoryDatastore::new();
        for (id, created, status) in [
            ("b", "2024-01-01T00:00:02Z", "pending"),
            ("a", "2024-01-01T00:00:01Z", "pending"),
            ("c", "2024-01-01T00:00:00Z", "completed"),
        ] {
            db.insert("jobs", json!({ "id": id, "created_at": created, "status": status }))
                .await
                .unwrap();
        }

        let rows = db
            .select(
                "jobs",
                &Query::new().eq("status", "pending").order_asc("created_at").limit(1),
            )
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["id"], "a");
    }

    #[tokio::test]
    async fn test_timestamps_compare_across_offsets() {
        let db = MemoryDatastore::new();
        db.insert("jobs", json!({ "id": "x", "timeout_at": "2024-01-01T10:00:00+02:00" }))
            .await
            .unwrap();

        // 08:00Z equals 10:00+02:00, so 08:30Z is later
        let rows = db
            .select("jobs", &Query::new().lt("timeout_at", "2024-01-01T08:30:00Z"))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn test_conditional_update_misses_when_value_changed() {
        let db = MemoryDatastore::new();
        db.insert("jobs", json!({ "id": "j1", "status": "pending", "attempts": 0 }))
            .await
            .unwrap();

        let filters = [Filter::eq("id", "j1"), Filter::eq("status", "pending")];
        let first = db
            .update("jobs", &filters, json!({ "status": "processing" }))
            .await
            .unwrap();
        assert_eq!(first.len(), 1);

        let second = db
            .update("jobs", &filters, json!({ "status": "processing" }))
            .await
            .unwrap();
        assert!(second.is_empty());
    }

    #[tokio::test]
    async fn test_null_filters() {
        let db = MemoryDatastore::new();
        db.insert("jobs", json!({ "id": "j1", "lease_id": null })).await.unwrap();
        db.insert("jobs", json!({ "id": "j2", "lease_id": "abc" })).await.unwrap();

        let rows = db.select("jobs", &Query::new().is_null("lease_id")).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["id"], "j1");

        // eq never matches NULL
        let rows = db
            .select("jobs", &Query::new().eq("lease_id", Value::Null))
            .await
            .unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_unfiltered_update_is_rejected() {
        let db = MemoryDatastore::new();
        let err = db.update("jobs", &[], json!({ "status": "failed" })).await.unwrap_err();
        assert!(matches!(err, DbError::RequestFailed(_)));
    }
}
