//! Asynchronous job client.
//!
//! Drives remote generation jobs through a [`ProviderAdapter`]: submit,
//! poll until a terminal state, normalise the produced output and
//! optionally chain jobs so that one stage's output feeds the next.
//!
//! - [`job`]: the [`Job`](job::Job) record and its forward-only state machine.
//! - [`config`]: explicit poll timing and retry budgets.
//! - [`poller`]: the submit/poll loop, inline or as a spawned task.
//! - [`resolver`]: success payload normalisation.
//! - [`chainer`]: sequential multi-stage pipelines.
//!
//! [`ProviderAdapter`]: shortgen_core::provider::ProviderAdapter

pub mod chainer;
pub mod config;
pub mod job;
pub mod poller;
pub mod resolver;

pub use chainer::{Pipeline, PipelineError, PipelineOutput, Stage, StageTemplate};
pub use config::PollConfig;
pub use job::{Job, JobError, JobState};
pub use poller::{JobHandle, JobPoller};
pub use resolver::{resolve, OutputRef, RawOutput, ResolveError};
