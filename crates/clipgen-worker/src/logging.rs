//! Structured job logging and subscriber setup.

use tracing::{error, info, warn, Span};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use clipgen_models::Job;

/// Initialize the global tracing subscriber.
///
/// `LOG_FORMAT=json` switches to JSON lines. `RUST_LOG` directives are added
/// on top of the `clipgen=info` default.
pub fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("clipgen=info"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
}

/// Lifecycle logging for one claimed job.
#[derive(Debug, Clone)]
pub struct JobLogger {
    job_id: String,
    job_type: String,
    attempt: u32,
    max_attempts: u32,
}

impl JobLogger {
    pub fn new(job: &Job) -> Self {
        Self {
            job_id: job.id.clone(),
            job_type: job.job_type.clone(),
            attempt: job.attempts,
            max_attempts: job.max_attempts,
        }
    }

    pub fn log_start(&self) {
        info!(
            job_id = %self.job_id,
            job_type = %self.job_type,
            attempt = self.attempt,
            max_attempts = self.max_attempts,
            "Job started"
        );
    }

    pub fn log_completion(&self, elapsed_secs: f64) {
        info!(
            job_id = %self.job_id,
            job_type = %self.job_type,
            elapsed_secs = format!("{:.1}", elapsed_secs),
            "Job completed"
        );
    }

    pub fn log_retry(&self, message: &str) {
        warn!(
            job_id = %self.job_id,
            job_type = %self.job_type,
            attempt = self.attempt,
            max_attempts = self.max_attempts,
            "Job failed, will retry: {}", message
        );
    }

    pub fn log_terminal(&self, message: &str) {
        error!(
            job_id = %self.job_id,
            job_type = %self.job_type,
            attempts = self.attempt,
            "Job failed permanently: {}", message
        );
    }

    pub fn log_lease_lost(&self) {
        warn!(
            job_id = %self.job_id,
            job_type = %self.job_type,
            "Lease lost before the result was recorded; discarding"
        );
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn job_type(&self) -> &str {
        &self.job_type
    }

    /// Span wrapping the whole execution of this job.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "job",
            job_id = %self.job_id,
            job_type = %self.job_type,
            attempt = self.attempt
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    #[test]
    fn test_job_logger_from_job() {
        let job: Job = serde_json::from_value(json!({
            "id": "job-1",
            "type": "transcribe",
            "payload": { "video_id": "v1" },
            "status": "processing",
            "attempts": 2,
            "max_attempts": 3,
            "created_at": Utc::now().to_rfc3339(),
        }))
        .unwrap();

        let logger = JobLogger::new(&job);
        assert_eq!(logger.job_id(), "job-1");
        assert_eq!(logger.job_type(), "transcribe");
    }
}
