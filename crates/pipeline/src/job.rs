//! The tracked record of one remote job.
//!
//! A [`Job`] moves forward only:
//!
//! ```text
//! Submitted -> Polling -> Succeeded | Failed | TimedOut
//! Submitted -> Failed            (submission rejected)
//! ```
//!
//! Mutators are crate-private so only the poller can drive a job. Callers
//! get read access and serialisable snapshots.

use std::fmt;

use serde::{Deserialize, Serialize};
use shortgen_core::provider::{StatusCheckError, SubmissionError};
use shortgen_core::types::{JobKind, JobRequest, Timestamp};

use crate::resolver::{OutputRef, ResolveError};

/// Lifecycle state of a [`Job`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Submitted,
    Polling,
    Succeeded,
    Failed,
    TimedOut,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Submitted => "submitted",
            JobState::Polling => "polling",
            JobState::Succeeded => "succeeded",
            JobState::Failed => "failed",
            JobState::TimedOut => "timed_out",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Succeeded | JobState::Failed | JobState::TimedOut
        )
    }

    /// States reachable from `self` in one step. Terminal states return an
    /// empty slice.
    pub fn valid_transitions(&self) -> &'static [JobState] {
        match self {
            JobState::Submitted => &[JobState::Polling, JobState::Failed],
            JobState::Polling => &[JobState::Succeeded, JobState::Failed, JobState::TimedOut],
            JobState::Succeeded | JobState::Failed | JobState::TimedOut => &[],
        }
    }

    pub fn can_transition(&self, to: JobState) -> bool {
        self.valid_transitions().contains(&to)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a job ended without an output.
#[derive(Debug, Clone, PartialEq, Serialize, thiserror::Error)]
#[serde(tag = "type", content = "detail", rename_all = "snake_case")]
pub enum JobError {
    /// The provider refused to create the job.
    #[error("{0}")]
    Submission(SubmissionError),

    /// The provider reported a terminal failure.
    #[error("Provider reported failure: {message}")]
    ProviderFailure { message: String },

    /// The attempt budget ran out before a terminal state was observed.
    #[error("Job did not finish within {attempts} status checks")]
    TimedOut { attempts: u32 },

    /// The provider succeeded but its output could not be normalised.
    #[error("{0}")]
    UnrecognizedOutput(ResolveError),

    /// Too many status checks failed in a row.
    #[error("{consecutive} consecutive status checks failed; last: {last}")]
    StatusCheck {
        consecutive: u32,
        last: StatusCheckError,
    },
}

impl JobError {
    /// `true` when submitting the same request again could plausibly
    /// succeed. The poller never does this itself.
    pub fn is_retryable_as_new_job(&self) -> bool {
        matches!(self, JobError::TimedOut { .. } | JobError::StatusCheck { .. })
    }

    /// Stable machine-readable code, used in API error bodies and logs.
    pub fn code(&self) -> &'static str {
        match self {
            JobError::Submission(_) => "SUBMISSION_REJECTED",
            JobError::ProviderFailure { .. } => "PROVIDER_FAILURE",
            JobError::TimedOut { .. } => "TIMED_OUT",
            JobError::UnrecognizedOutput(_) => "UNRECOGNIZED_OUTPUT",
            JobError::StatusCheck { .. } => "STATUS_CHECK_FAILED",
        }
    }
}

/// One remote job, from submission to terminal state.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    id: Option<String>,
    kind: JobKind,
    request: JobRequest,
    state: JobState,
    attempts: u32,
    /// `None` until terminal. Holding output and error in one `Result`
    /// keeps them mutually exclusive.
    result: Option<Result<OutputRef, JobError>>,
    provider_status: Option<String>,
    created_at: Timestamp,
    finished_at: Option<Timestamp>,
}

impl Job {
    pub(crate) fn new(kind: JobKind, request: JobRequest) -> Self {
        Self {
            id: None,
            kind,
            request,
            state: JobState::Submitted,
            attempts: 0,
            result: None,
            provider_status: None,
            created_at: chrono::Utc::now(),
            finished_at: None,
        }
    }

    /// Provider-assigned identifier, absent when submission failed.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn kind(&self) -> JobKind {
        self.kind
    }

    pub fn request(&self) -> &JobRequest {
        &self.request
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    /// Number of status checks performed so far, failed checks included.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn output(&self) -> Option<&OutputRef> {
        self.result.as_ref().and_then(|r| r.as_ref().ok())
    }

    pub fn error(&self) -> Option<&JobError> {
        self.result.as_ref().and_then(|r| r.as_ref().err())
    }

    pub fn result(&self) -> Option<&Result<OutputRef, JobError>> {
        self.result.as_ref()
    }

    /// Last status word reported by the provider.
    pub fn provider_status(&self) -> Option<&str> {
        self.provider_status.as_deref()
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    pub fn finished_at(&self) -> Option<Timestamp> {
        self.finished_at
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    // ---- poller-only mutators ----

    pub(crate) fn start_polling(&mut self, id: String) {
        self.transition(JobState::Polling);
        self.id = Some(id);
    }

    pub(crate) fn record_attempt(&mut self) {
        self.attempts += 1;
    }

    pub(crate) fn set_provider_status(&mut self, status: impl Into<String>) {
        self.provider_status = Some(status.into());
    }

    pub(crate) fn succeed(&mut self, output: OutputRef) {
        self.finish(JobState::Succeeded, Ok(output));
    }

    pub(crate) fn fail(&mut self, error: JobError) {
        self.finish(JobState::Failed, Err(error));
    }

    pub(crate) fn time_out(&mut self) {
        let attempts = self.attempts;
        self.finish(JobState::TimedOut, Err(JobError::TimedOut { attempts }));
    }

    fn finish(&mut self, state: JobState, result: Result<OutputRef, JobError>) {
        self.transition(state);
        self.result = Some(result);
        self.finished_at = Some(chrono::Utc::now());
    }

    fn transition(&mut self, to: JobState) {
        debug_assert!(
            self.state.can_transition(to),
            "invalid job transition {} -> {}",
            self.state,
            to
        );
        self.state = to;
    }
}

/// Wire shape of a [`Job`] snapshot.
#[derive(Serialize)]
struct JobRecord<'a> {
    id: Option<&'a str>,
    kind: JobKind,
    model: String,
    state: JobState,
    attempts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    provider_status: Option<&'a str>,
    output: Option<&'a OutputRef>,
    error: Option<JobErrorRecord<'a>>,
    created_at: Timestamp,
    finished_at: Option<Timestamp>,
}

#[derive(Serialize)]
struct JobErrorRecord<'a> {
    code: &'static str,
    message: String,
    retryable: bool,
    detail: &'a JobError,
}

impl Serialize for Job {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        JobRecord {
            id: self.id(),
            kind: self.kind,
            model: self.request.model.to_string(),
            state: self.state,
            attempts: self.attempts,
            provider_status: self.provider_status(),
            output: self.output(),
            error: self.error().map(|e| JobErrorRecord {
                code: e.code(),
                message: e.to_string(),
                retryable: e.is_retryable_as_new_job(),
                detail: e,
            }),
            created_at: self.created_at,
            finished_at: self.finished_at,
        }
        .serialize(serializer)
    }
}
