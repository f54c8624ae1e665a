//! Submit-then-poll driver.
//!
//! [`JobPoller::run`] drives one job to a terminal state inline.
//! [`JobPoller::spawn`] does the same on a background task and returns a
//! [`JobHandle`] that publishes every state change over a
//! [`tokio::sync::watch`] channel.

use std::sync::Arc;

use serde_json::Value;
use shortgen_core::provider::{ProviderAdapter, StatusReport};
use shortgen_core::types::{JobKind, JobRequest};
use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle};

use crate::config::PollConfig;
use crate::job::{Job, JobError};
use crate::resolver;

/// Drives jobs against one provider with one poll configuration.
///
/// Cheap to clone; the adapter is shared.
#[derive(Clone)]
pub struct JobPoller {
    adapter: Arc<dyn ProviderAdapter>,
    config: PollConfig,
}

impl JobPoller {
    pub fn new(adapter: Arc<dyn ProviderAdapter>, config: PollConfig) -> Self {
        Self { adapter, config }
    }

    pub fn config(&self) -> &PollConfig {
        &self.config
    }

    /// Submit `request` and poll until the job is terminal.
    ///
    /// Never returns an error: every failure mode ends up on the returned
    /// [`Job`] as a terminal state with its cause.
    pub async fn run(&self, kind: JobKind, request: JobRequest) -> Job {
        self.drive(Job::new(kind, request), None).await
    }

    /// Run the job on a background task.
    pub fn spawn(&self, kind: JobKind, request: JobRequest) -> JobHandle {
        let job = Job::new(kind, request);
        let (tx, updates) = watch::channel(job.clone());
        let poller = self.clone();
        let task = tokio::spawn(async move { poller.drive(job, Some(&tx)).await });
        JobHandle { updates, task }
    }

    async fn drive(&self, mut job: Job, updates: Option<&watch::Sender<Job>>) -> Job {
        let publish = |job: &Job| {
            if let Some(tx) = updates {
                tx.send_replace(job.clone());
            }
        };

        let kind = job.kind();
        let provider = self.adapter.name();

        let id = match self.adapter.submit(job.request()).await {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!(provider, kind = %kind, error = %e, "Job submission failed");
                job.fail(JobError::Submission(e));
                publish(&job);
                return job;
            }
        };

        tracing::info!(provider, job_id = %id, kind = %kind, "Job submitted");
        job.start_polling(id.clone());
        publish(&job);

        let max_attempts = self.config.max_attempts;
        let mut consecutive_errors = 0u32;

        while job.attempts() < max_attempts {
            if self.config.poll_interval.is_zero() {
                tokio::task::yield_now().await;
            } else {
                tokio::time::sleep(self.config.poll_interval).await;
            }

            let outcome = self.adapter.check_status(&id).await;
            job.record_attempt();
            let attempt = job.attempts();

            let report = match outcome {
                Ok(report) => {
                    consecutive_errors = 0;
                    report
                }
                Err(e) => {
                    consecutive_errors += 1;
                    tracing::warn!(
                        job_id = %id,
                        kind = %kind,
                        attempt,
                        max_attempts,
                        consecutive_errors,
                        error = %e,
                        "Status check failed",
                    );
                    if self
                        .config
                        .max_consecutive_status_errors
                        .is_some_and(|limit| consecutive_errors >= limit)
                    {
                        job.fail(JobError::StatusCheck {
                            consecutive: consecutive_errors,
                            last: e,
                        });
                        publish(&job);
                        return job;
                    }
                    publish(&job);
                    continue;
                }
            };

            tracing::debug!(
                job_id = %id,
                kind = %kind,
                attempt,
                max_attempts,
                provider_status = %report.provider_status,
                "Job status",
            );
            job.set_provider_status(report.provider_status.clone());

            if report.terminal {
                finish(&mut job, report);
                log_outcome(&job);
                publish(&job);
                return job;
            }
            publish(&job);
        }

        job.time_out();
        log_outcome(&job);
        publish(&job);
        job
    }
}

/// Apply a terminal report to the job.
fn finish(job: &mut Job, report: StatusReport) {
    if report.succeeded {
        match resolver::resolve(&report.raw_output) {
            Ok(output) => job.succeed(output),
            Err(e) => job.fail(JobError::UnrecognizedOutput(e)),
        }
    } else {
        job.fail(JobError::ProviderFailure {
            message: describe_provider_error(&report.raw_error),
        });
    }
}

/// Best-effort human message from an opaque provider error payload.
fn describe_provider_error(raw: &Value) -> String {
    match raw {
        Value::Null => "unknown error".to_string(),
        Value::String(s) if s.trim().is_empty() => "unknown error".to_string(),
        Value::String(s) => s.clone(),
        Value::Object(map) => ["message", "detail", "error"]
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_str))
            .map(str::to_string)
            .unwrap_or_else(|| raw.to_string()),
        other => other.to_string(),
    }
}

fn log_outcome(job: &Job) {
    let job_id = job.id().unwrap_or_default();
    match job.result() {
        Some(Ok(output)) => tracing::info!(
            job_id,
            kind = %job.kind(),
            attempts = job.attempts(),
            output = %output,
            "Job succeeded",
        ),
        Some(Err(e)) => tracing::warn!(
            job_id,
            kind = %job.kind(),
            attempts = job.attempts(),
            state = %job.state(),
            error = %e,
            "Job did not succeed",
        ),
        None => {}
    }
}

/// A job running on a background task.
///
/// Dropping the handle does not stop the task; call [`JobHandle::abort`]
/// for that. Aborting only stops local polling, the provider keeps
/// running the job.
pub struct JobHandle {
    updates: watch::Receiver<Job>,
    task: JoinHandle<Job>,
}

impl JobHandle {
    /// Latest published state of the job.
    pub fn snapshot(&self) -> Job {
        self.updates.borrow().clone()
    }

    /// A receiver that is notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<Job> {
        self.updates.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub fn abort(&self) {
        self.task.abort();
    }

    /// Wait for the job to reach a terminal state.
    pub async fn wait(self) -> Result<Job, JoinError> {
        self.task.await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn provider_error_descriptions() {
        assert_eq!(describe_provider_error(&json!(null)), "unknown error");
        assert_eq!(describe_provider_error(&json!("  ")), "unknown error");
        assert_eq!(describe_provider_error(&json!("OOM")), "OOM");
        assert_eq!(
            describe_provider_error(&json!({"detail": "NSFW content"})),
            "NSFW content"
        );
        assert_eq!(describe_provider_error(&json!({"code": 7})), r#"{"code":7}"#);
    }
}
