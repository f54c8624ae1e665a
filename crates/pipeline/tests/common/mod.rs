//! Scripted provider used by the pipeline integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;
use shortgen_core::provider::{ProviderAdapter, StatusCheckError, StatusReport, SubmissionError};
use shortgen_core::types::JobRequest;

/// One scripted status check response.
#[derive(Debug, Clone)]
pub enum Step {
    Pending,
    Succeeded(Value),
    Failed(Value),
    TransportError,
}

#[derive(Debug, Clone, Default)]
struct Script {
    reject: Option<SubmissionError>,
    steps: Vec<Step>,
}

#[derive(Debug, Default)]
struct Inner {
    scripts: HashMap<String, Script>,
    submits: HashMap<String, u32>,
    /// Job id -> (model key, status checks served).
    jobs: HashMap<String, (String, usize)>,
    requests: Vec<JobRequest>,
}

/// Provider whose behaviour is scripted per model. The last step of a
/// script repeats forever.
#[derive(Debug, Default)]
pub struct ScriptedAdapter {
    inner: Mutex<Inner>,
}

impl ScriptedAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(self, model: &str, steps: Vec<Step>) -> Self {
        self.inner.lock().unwrap().scripts.insert(
            model.to_string(),
            Script {
                reject: None,
                steps,
            },
        );
        self
    }

    pub fn reject(self, model: &str, error: SubmissionError) -> Self {
        self.inner.lock().unwrap().scripts.insert(
            model.to_string(),
            Script {
                reject: Some(error),
                steps: Vec::new(),
            },
        );
        self
    }

    pub fn submits(&self, model: &str) -> u32 {
        self.inner
            .lock()
            .unwrap()
            .submits
            .get(model)
            .copied()
            .unwrap_or(0)
    }

    /// Status checks served for `job_id`.
    pub fn checks(&self, job_id: &str) -> usize {
        self.inner
            .lock()
            .unwrap()
            .jobs
            .get(job_id)
            .map(|(_, served)| *served)
            .unwrap_or(0)
    }

    /// Every request submitted, in order.
    pub fn requests(&self) -> Vec<JobRequest> {
        self.inner.lock().unwrap().requests.clone()
    }
}

#[async_trait]
impl ProviderAdapter for ScriptedAdapter {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn submit(&self, request: &JobRequest) -> Result<String, SubmissionError> {
        let mut inner = self.inner.lock().unwrap();
        let model = request.model.to_string();
        *inner.submits.entry(model.clone()).or_default() += 1;
        inner.requests.push(request.clone());

        let script = inner.scripts.get(&model).cloned().unwrap_or_default();
        if let Some(error) = script.reject {
            return Err(error);
        }

        let id = format!("job-{}", inner.jobs.len() + 1);
        inner.jobs.insert(id.clone(), (model, 0));
        Ok(id)
    }

    async fn check_status(&self, job_id: &str) -> Result<StatusReport, StatusCheckError> {
        let mut inner = self.inner.lock().unwrap();
        let (model, served) = inner
            .jobs
            .get(job_id)
            .cloned()
            .ok_or_else(|| StatusCheckError::Rejected {
                status: 404,
                body: "unknown job".into(),
            })?;
        inner.jobs.insert(job_id.to_string(), (model.clone(), served + 1));

        let steps = inner
            .scripts
            .get(&model)
            .map(|s| s.steps.clone())
            .unwrap_or_default();
        let step = steps
            .get(served)
            .or_else(|| steps.last())
            .cloned()
            .unwrap_or(Step::Pending);

        match step {
            Step::Pending => Ok(StatusReport::pending("processing")),
            Step::Succeeded(output) => Ok(StatusReport::succeeded("succeeded", output)),
            Step::Failed(error) => Ok(StatusReport::failed("failed", error)),
            Step::TransportError => Err(StatusCheckError::Transport {
                message: "connection reset".into(),
            }),
        }
    }
}
