//! Datastore metrics collection.
//!
//! Provides standardized metrics for monitoring datastore operations:
//! - Request counters by operation, table and status
//! - Latency histograms
//! - Retry counters

use metrics::{counter, histogram};

// =============================================================================
// Metric Names
// =============================================================================

/// Metric name constants for consistency.
pub mod names {
    /// Total datastore requests by operation, table and status.
    pub const REQUESTS_TOTAL: &str = "datastore_requests_total";

    /// Total retry attempts by operation.
    pub const RETRIES_TOTAL: &str = "datastore_retries_total";

    /// Request latency in seconds by operation.
    pub const LATENCY_SECONDS: &str = "datastore_latency_seconds";

    /// Conditional updates that matched no rows.
    pub const CONDITIONAL_MISSES_TOTAL: &str = "datastore_conditional_misses_total";
}

// =============================================================================
// Recording Functions
// =============================================================================

/// Record metrics for a completed datastore request.
pub fn record_request(operation: &str, table: &str, status: u16, latency_ms: f64) {
    counter!(
        names::REQUESTS_TOTAL,
        "operation" => operation.to_string(),
        "table" => table.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    histogram!(
        names::LATENCY_SECONDS,
        "operation" => operation.to_string()
    )
    .record(latency_ms / 1000.0);
}

/// Record a retry attempt.
pub fn record_retry(operation: &str) {
    counter!(
        names::RETRIES_TOTAL,
        "operation" => operation.to_string()
    )
    .increment(1);
}

/// Record a conditional update that changed nothing.
pub fn record_conditional_miss(table: &str) {
    counter!(
        names::CONDITIONAL_MISSES_TOTAL,
        "table" => table.to_string()
    )
    .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_names() {
        assert!(names::REQUESTS_TOTAL.contains("requests"));
        assert!(names::RETRIES_TOTAL.contains("retries"));
        assert!(names::LATENCY_SECONDS.contains("latency"));
    }
}
