//! Prometheus metrics for the worker.

use std::net::SocketAddr;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Metric names as constants for consistency.
pub mod names {
    pub const JOBS_CLAIMED_TOTAL: &str = "clipgen_jobs_claimed_total";
    pub const JOBS_COMPLETED_TOTAL: &str = "clipgen_jobs_completed_total";
    pub const JOBS_FAILED_TOTAL: &str = "clipgen_jobs_failed_total";
    pub const JOBS_RECOVERED_TOTAL: &str = "clipgen_jobs_recovered_total";
    pub const JOB_DURATION_SECONDS: &str = "clipgen_job_duration_seconds";
}

/// Install the Prometheus recorder with an HTTP listener on `port`.
pub fn init_metrics(port: u16) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;
    Ok(())
}

pub fn record_job_claimed(job_type: &str) {
    counter!(names::JOBS_CLAIMED_TOTAL, "job_type" => job_type.to_string()).increment(1);
}

pub fn record_job_completed(job_type: &str, duration_secs: f64) {
    let labels = [("job_type", job_type.to_string())];
    counter!(names::JOBS_COMPLETED_TOTAL, &labels).increment(1);
    histogram!(names::JOB_DURATION_SECONDS, &labels).record(duration_secs);
}

pub fn record_job_failed(job_type: &str, terminal: bool) {
    counter!(
        names::JOBS_FAILED_TOTAL,
        "job_type" => job_type.to_string(),
        "terminal" => terminal.to_string()
    )
    .increment(1);
}

pub fn record_job_recovered(job_type: &str, terminal: bool) {
    counter!(
        names::JOBS_RECOVERED_TOTAL,
        "job_type" => job_type.to_string(),
        "terminal" => terminal.to_string()
    )
    .increment(1);
}
