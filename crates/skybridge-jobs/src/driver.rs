//! Async job driver
//!
//! Generic submit / poll / terminal-state loop for long-running vendor
//! operations. The loop sleeps a fixed interval between polls, tolerates a
//! bounded run of consecutive poll errors and stops promptly when its
//! cancellation token fires. Failed jobs are reported, never resubmitted.

use crate::job::{AsyncJob, JobState};
use async_trait::async_trait;
use chrono::Utc;
use skybridge_core::{Config, SkybridgeError, SkybridgeResult};
use std::fmt::Debug;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);
const DEFAULT_MAX_POLL_ERRORS: u32 = 3;

/// Vendor-specific callbacks for one job.
#[async_trait]
pub trait JobOperations: Send + Sync {
    type Status: Debug + Send;

    /// Start the job and return its id.
    async fn submit(&self) -> anyhow::Result<String>;

    /// Fetch the current status.
    async fn poll(&self, job_id: &str) -> anyhow::Result<Self::Status>;

    fn is_terminal(&self, status: &Self::Status) -> bool;

    fn is_success(&self, status: &Self::Status) -> bool;

    /// Diagnostic for a failed terminal status.
    fn failure_message(&self, status: &Self::Status) -> String {
        format!("job ended in {:?}", status)
    }

    /// Ask the vendor to stop the job. Best-effort.
    async fn cancel(&self, _job_id: &str) -> anyhow::Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobDriverConfig {
    pub poll_interval: Duration,
    /// Consecutive poll errors tolerated before the job is declared failed.
    pub max_poll_errors: u32,
}

impl Default for JobDriverConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_poll_errors: DEFAULT_MAX_POLL_ERRORS,
        }
    }
}

impl JobDriverConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            poll_interval: config.job_poll_interval,
            max_poll_errors: config.job_max_poll_errors,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct JobDriver {
    config: JobDriverConfig,
}

impl JobDriver {
    pub fn new(config: JobDriverConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &JobDriverConfig {
        &self.config
    }

    /// Drive `ops` to a terminal state.
    ///
    /// Returns the job in either terminal state. Errors are reserved for a
    /// failed submission, exhausted poll retries and cancellation.
    pub async fn run<O: JobOperations>(
        &self,
        ops: &O,
        cancel: &CancellationToken,
    ) -> SkybridgeResult<AsyncJob<O::Status>> {
        let job_id = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(SkybridgeError::JobCancelled { job_id: None }),
            submitted = ops.submit() => submitted.map_err(|e| SkybridgeError::JobFailed {
                job_id: None,
                message: format!("submission failed: {:#}", e),
            })?,
        };

        let mut job = AsyncJob::submitted(job_id);
        let mut consecutive_errors = 0u32;
        tracing::info!(job_id = %job.id, "Job submitted");

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(self.cancel_job(ops, &job).await),
                _ = sleep(self.config.poll_interval) => {}
            }

            let polled = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(self.cancel_job(ops, &job).await),
                polled = ops.poll(&job.id) => polled,
            };
            job.polls += 1;

            match polled {
                Ok(status) => {
                    consecutive_errors = 0;
                    if ops.is_terminal(&status) {
                        job.finished_at = Some(Utc::now());
                        if ops.is_success(&status) {
                            job.state = JobState::Succeeded;
                            tracing::info!(job_id = %job.id, polls = job.polls, "Job succeeded");
                        } else {
                            let message = ops.failure_message(&status);
                            tracing::warn!(
                                job_id = %job.id,
                                polls = job.polls,
                                error = %message,
                                "Job failed"
                            );
                            job.state = JobState::Failed;
                            job.error = Some(message);
                        }
                        job.status = Some(status);
                        return Ok(job);
                    }

                    if job.state == JobState::Submitted {
                        job.state = JobState::Running;
                    }
                    tracing::debug!(job_id = %job.id, polls = job.polls, status = ?status, "Job still running");
                    job.status = Some(status);
                }
                Err(e) => {
                    consecutive_errors += 1;
                    tracing::warn!(
                        job_id = %job.id,
                        error = %e,
                        consecutive_errors,
                        max_poll_errors = self.config.max_poll_errors,
                        "Job poll failed"
                    );
                    if consecutive_errors > self.config.max_poll_errors {
                        return Err(SkybridgeError::JobFailed {
                            job_id: Some(job.id.clone()),
                            message: format!(
                                "polling failed {} times in a row: {:#}",
                                consecutive_errors, e
                            ),
                        });
                    }
                }
            }
        }
    }

    /// Like [`JobDriver::run`], but a failed terminal state becomes
    /// [`SkybridgeError::JobFailed`] carrying the vendor's diagnostic.
    pub async fn run_to_completion<O: JobOperations>(
        &self,
        ops: &O,
        cancel: &CancellationToken,
    ) -> SkybridgeResult<AsyncJob<O::Status>> {
        let job = self.run(ops, cancel).await?;
        if job.succeeded() {
            Ok(job)
        } else {
            Err(SkybridgeError::JobFailed {
                message: job
                    .error
                    .clone()
                    .unwrap_or_else(|| "job failed without a diagnostic".to_string()),
                job_id: Some(job.id),
            })
        }
    }

    /// Run with a deadline. When `timeout` elapses the driver is cancelled
    /// through a child token and the job fails with a timeout message.
    pub async fn run_with_timeout<O: JobOperations>(
        &self,
        ops: &O,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> SkybridgeResult<AsyncJob<O::Status>> {
        let child = cancel.child_token();
        let run = self.run_to_completion(ops, &child);
        tokio::pin!(run);

        tokio::select! {
            result = &mut run => return result,
            _ = sleep(timeout) => {
                tracing::warn!(timeout_ms = timeout.as_millis() as u64, "Job deadline reached; cancelling");
                child.cancel();
            }
        }

        match run.await {
            Err(SkybridgeError::JobCancelled { job_id }) if !cancel.is_cancelled() => {
                Err(SkybridgeError::JobFailed {
                    job_id,
                    message: format!("timed out after {:?}", timeout),
                })
            }
            other => other,
        }
    }

    async fn cancel_job<S>(&self, ops: &impl JobOperations, job: &AsyncJob<S>) -> SkybridgeError {
        tracing::info!(job_id = %job.id, polls = job.polls, "Job cancelled; stopping vendor job");
        if let Err(e) = ops.cancel(&job.id).await {
            tracing::warn!(job_id = %job.id, error = %e, "Vendor job cancellation failed");
        }
        SkybridgeError::JobCancelled {
            job_id: Some(job.id.clone()),
        }
    }
}
