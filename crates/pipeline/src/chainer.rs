//! Sequential multi-stage pipelines.
//!
//! Each [`Stage`] runs as its own job. A stage's template may name an input
//! field that receives the previous stage's output reference, so an
//! image-to-video pipeline is two stages with the second one chained on
//! `input_image`. The first failed stage stops the pipeline; later stages
//! are never submitted.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use shortgen_core::provider::ProviderAdapter;
use shortgen_core::types::{JobKind, JobRequest, ModelRef};

use crate::config::PollConfig;
use crate::job::{Job, JobError, JobState};
use crate::poller::JobPoller;
use crate::resolver::OutputRef;

/// How to build one stage's request.
#[derive(Debug, Clone, PartialEq)]
pub struct StageTemplate {
    pub model: ModelRef,
    pub input: serde_json::Map<String, serde_json::Value>,
    /// Input field that receives the previous stage's output.
    pub previous_output_field: Option<String>,
}

impl StageTemplate {
    /// A template that submits `request` as-is.
    pub fn from_request(request: JobRequest) -> Self {
        Self {
            model: request.model,
            input: request.input,
            previous_output_field: None,
        }
    }

    /// Inject the previous stage's output into `field`.
    pub fn chained(mut self, field: impl Into<String>) -> Self {
        self.previous_output_field = Some(field.into());
        self
    }

    /// Build the concrete request. Returns `None` when the template is
    /// chained but there is no previous output.
    pub fn render(&self, previous: Option<&OutputRef>) -> Option<JobRequest> {
        let mut request = JobRequest {
            model: self.model.clone(),
            input: self.input.clone(),
        };
        if let Some(field) = &self.previous_output_field {
            request
                .input
                .insert(field.clone(), previous?.as_str().into());
        }
        Some(request)
    }
}

/// One step of a [`Pipeline`].
#[derive(Debug, Clone, PartialEq)]
pub struct Stage {
    pub kind: JobKind,
    pub template: StageTemplate,
    /// Overrides the pipeline's default for this stage's kind.
    pub poll: Option<PollConfig>,
}

impl Stage {
    pub fn new(kind: JobKind, template: StageTemplate) -> Self {
        Self {
            kind,
            template,
            poll: None,
        }
    }

    pub fn with_poll(mut self, poll: PollConfig) -> Self {
        self.poll = Some(poll);
        self
    }
}

/// Everything a successful pipeline produced, in stage order.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutput {
    pub jobs: Vec<Job>,
    pub outputs: Vec<OutputRef>,
}

impl PipelineOutput {
    /// Output of the last stage.
    pub fn headline(&self) -> Option<&OutputRef> {
        self.outputs.last()
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum PipelineError {
    #[error("Pipeline has no stages")]
    Empty,

    #[error("Stage {stage} expects a previous output but none is available")]
    InvalidTemplate { stage: usize },

    #[error("Stage {stage} has an unusable poll configuration: {reason}")]
    InvalidConfig { stage: usize, reason: String },

    #[error("Stage {stage} ({kind}) ended {state} after {attempts} status checks: {cause}")]
    StageFailed {
        stage: usize,
        kind: JobKind,
        state: JobState,
        attempts: u32,
        cause: JobError,
        /// Every job run so far, the failed one last.
        jobs: Vec<Job>,
    },

    /// A stage finished without a result. The poller never produces this.
    #[error("Stage {stage} finished without a result")]
    Incomplete { stage: usize },
}

impl PipelineError {
    /// Jobs that ran before the pipeline stopped.
    pub fn jobs(&self) -> &[Job] {
        match self {
            PipelineError::StageFailed { jobs, .. } => jobs,
            _ => &[],
        }
    }

    pub fn cause(&self) -> Option<&JobError> {
        match self {
            PipelineError::StageFailed { cause, .. } => Some(cause),
            _ => None,
        }
    }
}

/// Runs stages one after another against a single provider.
#[derive(Clone)]
pub struct Pipeline {
    adapter: Arc<dyn ProviderAdapter>,
    defaults: HashMap<JobKind, PollConfig>,
}

impl Pipeline {
    pub fn new(adapter: Arc<dyn ProviderAdapter>) -> Self {
        Self {
            adapter,
            defaults: HashMap::new(),
        }
    }

    /// Poll configuration used for stages of `kind` without an override.
    pub fn with_default(mut self, kind: JobKind, config: PollConfig) -> Self {
        self.defaults.insert(kind, config);
        self
    }

    fn poll_config(&self, stage: &Stage) -> PollConfig {
        stage
            .poll
            .or_else(|| self.defaults.get(&stage.kind).copied())
            .unwrap_or_else(|| PollConfig::for_kind(stage.kind))
    }

    /// Run every stage in order, feeding outputs forward.
    pub async fn run(&self, stages: Vec<Stage>) -> Result<PipelineOutput, PipelineError> {
        let first = stages.first().ok_or(PipelineError::Empty)?;
        if first.template.previous_output_field.is_some() {
            return Err(PipelineError::InvalidTemplate { stage: 0 });
        }
        let configs: Vec<PollConfig> = stages.iter().map(|s| self.poll_config(s)).collect();
        for (index, config) in configs.iter().enumerate() {
            config
                .validate()
                .map_err(|e| PipelineError::InvalidConfig {
                    stage: index,
                    reason: e.to_string(),
                })?;
        }

        let total = stages.len();
        let mut jobs = Vec::with_capacity(total);
        let mut outputs: Vec<OutputRef> = Vec::with_capacity(total);

        for (index, (stage, config)) in stages.iter().zip(configs).enumerate() {
            let request = stage
                .template
                .render(outputs.last())
                .ok_or(PipelineError::InvalidTemplate { stage: index })?;

            tracing::info!(stage = index, total, kind = %stage.kind, model = %request.model, "Running pipeline stage");

            let poller = JobPoller::new(Arc::clone(&self.adapter), config);
            let job = poller.run(stage.kind, request).await;

            match job.result().cloned() {
                Some(Ok(output)) => {
                    outputs.push(output);
                    jobs.push(job);
                }
                Some(Err(cause)) => {
                    tracing::warn!(stage = index, total, kind = %stage.kind, error = %cause, "Pipeline stopped");
                    let (state, attempts) = (job.state(), job.attempts());
                    jobs.push(job);
                    return Err(PipelineError::StageFailed {
                        stage: index,
                        kind: stage.kind,
                        state,
                        attempts,
                        cause,
                        jobs,
                    });
                }
                None => return Err(PipelineError::Incomplete { stage: index }),
            }
        }

        Ok(PipelineOutput { jobs, outputs })
    }
}
