//! Job queue over the `jobs` table.
//!
//! Every state transition is a conditional update. A claim only matches a row
//! that is still pending with the attempts count the claimer observed. Writes
//! made on behalf of a running job also match on the lease token handed out at
//! claim time, so a worker whose lease was recovered cannot overwrite the row.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use clipgen_db::{tables, Datastore, Filter, Query};
use clipgen_models::{
    Job, JobStatus, JobTask, LeaseId, ProcessingProgress, Stage, DEFAULT_MAX_ATTEMPTS,
};

use crate::config::QueueConfig;
use crate::error::{QueueError, QueueResult};

/// Error message written by timeout recovery.
pub const TIMEOUT_ERROR: &str = "Job timed out";

/// Error prefix written onto pending rows that cannot be decoded.
pub const INVALID_ROW_ERROR: &str = "Invalid job row";

/// Malformed rows a single claim call will reject before giving up.
const MAX_REJECTED_PER_CLAIM: usize = 16;

/// Result of [`JobQueue::fail`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailOutcome {
    /// Returned to pending for another attempt
    Retrying,
    /// Attempts exhausted; the job is failed for good
    Terminal,
}

impl FailOutcome {
    pub fn is_terminal(&self) -> bool {
        matches!(self, FailOutcome::Terminal)
    }
}

/// A job moved out of `processing` by timeout recovery.
#[derive(Debug, Clone)]
pub struct Recovered {
    /// The row as it was before recovery
    pub job: Job,
    /// True if the job was marked failed rather than pending
    pub terminal: bool,
}

/// Job queue client.
pub struct JobQueue {
    db: Arc<dyn Datastore>,
    config: QueueConfig,
}

impl JobQueue {
    pub fn new(db: Arc<dyn Datastore>, config: QueueConfig) -> Self {
        Self { db, config }
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// Insert a pending job with the default retry budget.
    pub async fn enqueue(&self, task: JobTask) -> QueueResult<Job> {
        self.enqueue_with_max_attempts(task, DEFAULT_MAX_ATTEMPTS).await
    }

    /// Insert a pending job.
    pub async fn enqueue_with_max_attempts(
        &self,
        task: JobTask,
        max_attempts: u32,
    ) -> QueueResult<Job> {
        let (job_type, payload) = task.into_parts();
        let row = self
            .db
            .insert(
                tables::JOBS,
                json!({
                    "type": job_type.as_str(),
                    "payload": payload,
                    "status": JobStatus::Pending.as_str(),
                    "attempts": 0,
                    "max_attempts": max_attempts,
                }),
            )
            .await?;

        let job: Job = serde_json::from_value(row)?;
        info!(job_id = %job.id, job_type = %job.job_type, "Enqueued job");
        Ok(job)
    }

    /// Fetch a job row by id.
    pub async fn get(&self, job_id: &str) -> QueueResult<Option<Job>> {
        let rows = self
            .db
            .select(tables::JOBS, &Query::new().eq("id", job_id).limit(1))
            .await?;
        rows.into_iter()
            .next()
            .map(serde_json::from_value)
            .transpose()
            .map_err(QueueError::from)
    }

    /// Claim the oldest pending job.
    ///
    /// Returns `Ok(None)` when nothing is pending or another worker won the
    /// race for the selected row. Pending rows that do not decode are moved to
    /// `failed` so they cannot hold up the rows queued behind them.
    pub async fn claim(&self) -> QueueResult<Option<Job>> {
        for _ in 0..MAX_REJECTED_PER_CLAIM {
            let rows = self
                .db
                .select(
                    tables::JOBS,
                    &Query::new()
                        .eq("status", JobStatus::Pending.as_str())
                        .order_asc("created_at")
                        .limit(1),
                )
                .await?;

            let Some(row) = rows.into_iter().next() else {
                return Ok(None);
            };

            // A NULL counter decodes as zero but only matches `is.null`
            let attempts_unset = row.get("attempts").map_or(true, Value::is_null);
            match serde_json::from_value::<Job>(row.clone()) {
                Ok(observed) => {
                    let fence = if attempts_unset {
                        Filter::is_null("attempts")
                    } else {
                        Filter::eq("attempts", observed.attempts)
                    };
                    return self.claim_observed(&observed, fence).await;
                }
                Err(e) => self.reject_malformed(&row, &e.to_string()).await?,
            }
        }

        Ok(None)
    }

    /// Conditionally move an observed pending row to processing.
    pub async fn try_claim(&self, observed: &Job) -> QueueResult<Option<Job>> {
        self.claim_observed(observed, Filter::eq("attempts", observed.attempts))
            .await
    }

    async fn claim_observed(
        &self,
        observed: &Job,
        attempts_fence: Filter,
    ) -> QueueResult<Option<Job>> {
        let now = Utc::now();
        let lease = self.config.lease_for(&observed.job_type);
        let timeout_at = now
            + chrono::Duration::from_std(lease)
                .unwrap_or_else(|_| chrono::Duration::seconds(300));
        let lease_id = LeaseId::new();

        let rows = self
            .db
            .update(
                tables::JOBS,
                &[
                    Filter::eq("id", observed.id.as_str()),
                    Filter::eq("status", JobStatus::Pending.as_str()),
                    attempts_fence,
                ],
                json!({
                    "status": JobStatus::Processing.as_str(),
                    "attempts": observed.attempts + 1,
                    "timeout_at": timeout_at.to_rfc3339(),
                    "lease_id": lease_id.as_str(),
                    "processing_progress": ProcessingProgress::new(Stage::Starting),
                    "updated_at": now.to_rfc3339(),
                }),
            )
            .await?;

        let Some(row) = rows.into_iter().next() else {
            debug!(job_id = %observed.id, "Claim lost to another worker");
            return Ok(None);
        };

        let job: Job = serde_json::from_value(row)?;
        info!(
            job_id = %job.id,
            job_type = %job.job_type,
            attempt = job.attempts,
            max_attempts = job.max_attempts,
            lease_secs = lease.as_secs(),
            "Claimed job"
        );
        Ok(Some(job))
    }

    /// Fail a pending row that cannot be decoded into a [`Job`].
    async fn reject_malformed(&self, row: &Value, reason: &str) -> QueueResult<()> {
        let Some(id) = row.get("id").filter(|id| !id.is_null()).cloned() else {
            return Err(QueueError::MalformedRow(reason.to_string()));
        };
        let message = format!("{}: {}", INVALID_ROW_ERROR, reason);

        let updated = self
            .db
            .update(
                tables::JOBS,
                &[
                    Filter::eq("id", id.clone()),
                    Filter::eq("status", JobStatus::Pending.as_str()),
                ],
                json!({
                    "status": JobStatus::Failed.as_str(),
                    "error": message,
                    "processing_progress": ProcessingProgress::new(Stage::Error).with_message(&message),
                    "timeout_at": Value::Null,
                    "lease_id": Value::Null,
                    "updated_at": Utc::now().to_rfc3339(),
                }),
            )
            .await?;

        if updated.is_empty() {
            debug!(job_id = %id, "Malformed job changed before it could be rejected");
        } else {
            warn!(job_id = %id, "Rejected malformed pending job: {}", reason);
        }
        Ok(())
    }

    /// Recover every processing job whose lease deadline has passed.
    pub async fn recover_expired(&self) -> QueueResult<Vec<Recovered>> {
        self.recover_expired_at(Utc::now()).await
    }

    /// Recover jobs whose deadline is before `now`.
    pub async fn recover_expired_at(&self, now: DateTime<Utc>) -> QueueResult<Vec<Recovered>> {
        let rows = self
            .db
            .select(
                tables::JOBS,
                &Query::new()
                    .eq("status", JobStatus::Processing.as_str())
                    .lt("timeout_at", now.to_rfc3339()),
            )
            .await?;

        let mut recovered = Vec::new();
        for row in rows {
            let job: Job = match serde_json::from_value(row) {
                Ok(job) => job,
                Err(e) => {
                    warn!("Skipping undecodable job row during recovery: {}", e);
                    continue;
                }
            };

            let terminal = job.is_exhausted();
            let status = if terminal {
                JobStatus::Failed
            } else {
                JobStatus::Pending
            };

            let updated = self
                .db
                .update(
                    tables::JOBS,
                    &lease_filters(&job),
                    json!({
                        "status": status.as_str(),
                        "error": TIMEOUT_ERROR,
                        "processing_progress": ProcessingProgress::new(Stage::Timeout),
                        "timeout_at": Value::Null,
                        "lease_id": Value::Null,
                        "updated_at": now.to_rfc3339(),
                    }),
                )
                .await?;

            if updated.is_empty() {
                debug!(job_id = %job.id, "Expired job changed before recovery");
                continue;
            }

            warn!(
                job_id = %job.id,
                job_type = %job.job_type,
                attempts = job.attempts,
                max_attempts = job.max_attempts,
                new_status = %status,
                "Recovered timed out job"
            );
            recovered.push(Recovered { job, terminal });
        }

        Ok(recovered)
    }

    /// Mark a claimed job completed with its result.
    pub async fn complete(&self, job: &Job, result: Value) -> QueueResult<()> {
        let rows = self
            .db
            .update(
                tables::JOBS,
                &lease_filters(job),
                json!({
                    "status": JobStatus::Completed.as_str(),
                    "result": result,
                    "error": Value::Null,
                    "processing_progress": ProcessingProgress::new(Stage::Done),
                    "timeout_at": Value::Null,
                    "lease_id": Value::Null,
                    "updated_at": Utc::now().to_rfc3339(),
                }),
            )
            .await?;

        if rows.is_empty() {
            return Err(QueueError::lease_lost(&job.id));
        }
        info!(job_id = %job.id, job_type = %job.job_type, "Job completed");
        Ok(())
    }

    /// Record a failed attempt. Terminal once attempts reach the budget.
    pub async fn fail(&self, job: &Job, error: &str) -> QueueResult<FailOutcome> {
        let outcome = if job.is_exhausted() {
            FailOutcome::Terminal
        } else {
            FailOutcome::Retrying
        };
        let status = match outcome {
            FailOutcome::Terminal => JobStatus::Failed,
            FailOutcome::Retrying => JobStatus::Pending,
        };

        let rows = self
            .db
            .update(
                tables::JOBS,
                &lease_filters(job),
                json!({
                    "status": status.as_str(),
                    "error": error,
                    "processing_progress": ProcessingProgress::new(Stage::Error).with_message(error),
                    "timeout_at": Value::Null,
                    "lease_id": Value::Null,
                    "updated_at": Utc::now().to_rfc3339(),
                }),
            )
            .await?;

        if rows.is_empty() {
            return Err(QueueError::lease_lost(&job.id));
        }
        warn!(
            job_id = %job.id,
            job_type = %job.job_type,
            attempts = job.attempts,
            max_attempts = job.max_attempts,
            terminal = outcome.is_terminal(),
            "Job attempt failed: {}",
            error
        );
        Ok(outcome)
    }

    /// Update the progress marker of a claimed job. Failures are only logged.
    pub async fn report_progress(&self, job: &Job, stage: Stage, percent: Option<u8>) {
        let mut progress = ProcessingProgress::new(stage);
        if let Some(p) = percent {
            progress = progress.with_percent(p);
        }

        match self
            .db
            .update(
                tables::JOBS,
                &lease_filters(job),
                json!({
                    "processing_progress": progress,
                    "updated_at": Utc::now().to_rfc3339(),
                }),
            )
            .await
        {
            Ok(rows) if rows.is_empty() => {
                warn!(job_id = %job.id, stage = %stage, "Progress not recorded, lease lost");
            }
            Ok(_) => debug!(job_id = %job.id, stage = %stage, "Progress updated"),
            Err(e) => warn!(job_id = %job.id, stage = %stage, "Failed to update progress: {}", e),
        }
    }
}

/// Filters matching a job only while it is still held under the same lease.
fn lease_filters(job: &Job) -> [Filter; 3] {
    [
        Filter::eq("id", job.id.as_str()),
        Filter::eq("status", JobStatus::Processing.as_str()),
        Filter::eq_or_null("lease_id", job.lease_id.as_ref().map(|l| l.as_str())),
    ]
}
