//! Job executor.
//!
//! One job in flight per process. Each iteration recovers expired leases,
//! claims the oldest pending job, runs it and records the outcome. Any number
//! of workers can run this loop against the same datastore.

use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, error, info, warn, Instrument};

use clipgen_models::{Job, JobTask, JobType, VideoStatus};
use clipgen_queue::{FailOutcome, QueueError};

use crate::clip_job;
use crate::context::JobContext;
use crate::error::WorkerResult;
use crate::logging::JobLogger;
use crate::metrics;
use crate::transcribe_job;

/// Row that takes the blame when a job fails for good.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dependent {
    Video(String),
    Clip(String),
}

impl Dependent {
    /// Read from the raw payload so jobs whose payload failed validation are
    /// still covered.
    pub fn of(job: &Job) -> Option<Self> {
        let field = |key: &str| {
            job.payload
                .get(key)
                .and_then(Value::as_str)
                .map(str::to_string)
        };

        match job.kind()? {
            JobType::Transcribe => field("video_id").map(Dependent::Video),
            JobType::GenerateClip => field("clip_id").map(Dependent::Clip),
        }
    }
}

/// Job executor that polls the queue and runs jobs.
pub struct JobExecutor {
    ctx: Arc<JobContext>,
    shutdown: watch::Sender<bool>,
}

impl JobExecutor {
    pub fn new(ctx: JobContext) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            ctx: Arc::new(ctx),
            shutdown,
        }
    }

    pub fn context(&self) -> &JobContext {
        &self.ctx
    }

    /// Run until [`shutdown`](Self::shutdown) is called.
    ///
    /// Shutdown does not wait for the current job: its future is dropped,
    /// which kills any child process and removes its scratch directory. The
    /// lease is recovered later by whichever worker scans first.
    pub async fn run(&self) -> WorkerResult<()> {
        info!(
            poll_interval_ms = self.ctx.config.poll_interval.as_millis() as u64,
            idle_after_job_ms = self.ctx.config.idle_after_job.as_millis() as u64,
            work_dir = %self.ctx.config.work_dir.display(),
            "Starting job executor"
        );

        let mut shutdown_rx = self.shutdown.subscribe();

        loop {
            if *shutdown_rx.borrow() {
                break;
            }

            let delay = tokio::select! {
                _ = shutdown_rx.changed() => break,
                result = self.tick() => match result {
                    Ok(true) => self.ctx.config.idle_after_job,
                    Ok(false) => self.ctx.config.poll_interval,
                    Err(e) => {
                        error!("Worker loop error: {}", e);
                        self.ctx.config.poll_interval
                    }
                },
            };

            tokio::select! {
                _ = shutdown_rx.changed() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        info!("Job executor stopped");
        Ok(())
    }

    /// Signal shutdown.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }

    /// One loop iteration. Returns whether a job was claimed and run.
    pub async fn tick(&self) -> WorkerResult<bool> {
        self.recover_expired().await?;

        let Some(job) = self.ctx.queue.claim().await? else {
            debug!("No pending jobs");
            return Ok(false);
        };

        metrics::record_job_claimed(&job.job_type);
        self.execute(job).await;
        Ok(true)
    }

    /// Recover expired leases and fail the dependents of exhausted jobs.
    pub async fn recover_expired(&self) -> WorkerResult<usize> {
        let recovered = self.ctx.queue.recover_expired().await?;

        for r in &recovered {
            metrics::record_job_recovered(&r.job.job_type, r.terminal);
            if r.terminal {
                self.mark_dependent_error(&r.job).await;
            }
        }
        Ok(recovered.len())
    }

    async fn execute(&self, job: Job) {
        let logger = JobLogger::new(&job);
        let span = logger.create_span();

        async {
            logger.log_start();
            let started = Instant::now();

            match self.dispatch(&job).await {
                Ok(result) => match self.ctx.queue.complete(&job, result).await {
                    Ok(()) => {
                        let elapsed = started.elapsed().as_secs_f64();
                        metrics::record_job_completed(&job.job_type, elapsed);
                        logger.log_completion(elapsed);
                    }
                    Err(QueueError::LeaseLost(_)) => logger.log_lease_lost(),
                    Err(e) => error!("Failed to record job completion: {}", e),
                },
                Err(e) => {
                    let message = e.to_string();
                    match self.ctx.queue.fail(&job, &message).await {
                        Ok(FailOutcome::Retrying) => {
                            metrics::record_job_failed(&job.job_type, false);
                            logger.log_retry(&message);
                        }
                        Ok(FailOutcome::Terminal) => {
                            metrics::record_job_failed(&job.job_type, true);
                            logger.log_terminal(&message);
                            self.mark_dependent_error(&job).await;
                        }
                        Err(QueueError::LeaseLost(_)) => logger.log_lease_lost(),
                        Err(qe) => error!("Failed to record job failure ({}): {}", message, qe),
                    }
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn dispatch(&self, job: &Job) -> WorkerResult<Value> {
        let value = match job.task()? {
            JobTask::Transcribe(payload) => {
                serde_json::to_value(transcribe_job::run(&self.ctx, job, &payload).await?)?
            }
            JobTask::GenerateClip(payload) => {
                serde_json::to_value(clip_job::run(&self.ctx, job, &payload).await?)?
            }
        };
        Ok(value)
    }

    async fn mark_dependent_error(&self, job: &Job) {
        let result = match Dependent::of(job) {
            Some(Dependent::Video(id)) => {
                self.ctx.videos.set_status(&id, VideoStatus::Error).await
            }
            Some(Dependent::Clip(id)) => self.ctx.clips.mark_error(&id).await,
            None => {
                warn!(job_id = %job.id, job_type = %job.job_type, "No dependent row to mark as errored");
                return;
            }
        };

        if let Err(e) = result {
            warn!(job_id = %job.id, "Failed to mark dependent row as errored: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn job(job_type: &str, payload: Value) -> Job {
        serde_json::from_value(json!({
            "id": "j1",
            "type": job_type,
            "payload": payload,
            "status": "processing",
            "attempts": 3,
            "max_attempts": 3,
            "created_at": Utc::now().to_rfc3339(),
        }))
        .unwrap()
    }

    #[test]
    fn test_dependent_of_transcribe_is_video() {
        let job = job("transcribe", json!({ "video_id": "v1" }));
        assert_eq!(Dependent::of(&job), Some(Dependent::Video("v1".into())));
    }

    #[test]
    fn test_dependent_of_clip_survives_invalid_range() {
        let job = job(
            "generate_clip",
            json!({ "video_id": "v1", "clip_id": "c1", "start": 9.0, "end": 3.0 }),
        );
        assert!(job.task().is_err());
        assert_eq!(Dependent::of(&job), Some(Dependent::Clip("c1".into())));
    }

    #[test]
    fn test_dependent_of_unknown_type() {
        let job = job("render_gif", json!({ "video_id": "v1" }));
        assert_eq!(Dependent::of(&job), None);
    }
}
