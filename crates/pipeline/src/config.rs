//! Poll timing and retry budgets.

use std::time::Duration;

use shortgen_core::error::CoreError;
use shortgen_core::types::JobKind;

/// Default interval between image job status checks.
pub const IMAGE_POLL_INTERVAL: Duration = Duration::from_secs(3);
/// Default status check budget for image jobs (about 90 s).
pub const IMAGE_MAX_ATTEMPTS: u32 = 30;
/// Default interval between video job status checks.
pub const VIDEO_POLL_INTERVAL: Duration = Duration::from_secs(5);
/// Default status check budget for video jobs (about 5 min).
pub const VIDEO_MAX_ATTEMPTS: u32 = 60;
/// Default number of back-to-back failed status checks tolerated.
pub const DEFAULT_MAX_CONSECUTIVE_STATUS_ERRORS: u32 = 5;

/// How a single job is polled.
///
/// A zero `poll_interval` disables sleeping between checks, which is meant
/// for tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub poll_interval: Duration,
    /// Upper bound on status checks, failed checks included.
    pub max_attempts: u32,
    /// Fail early once this many status checks fail in a row. `None`
    /// leaves only `max_attempts` in charge.
    pub max_consecutive_status_errors: Option<u32>,
}

impl PollConfig {
    pub fn new(poll_interval: Duration, max_attempts: u32) -> Self {
        Self {
            poll_interval,
            max_attempts,
            max_consecutive_status_errors: Some(DEFAULT_MAX_CONSECUTIVE_STATUS_ERRORS),
        }
    }

    /// Defaults tuned to how long each kind of job usually runs.
    pub fn for_kind(kind: JobKind) -> Self {
        match kind {
            JobKind::ImageGeneration => Self::new(IMAGE_POLL_INTERVAL, IMAGE_MAX_ATTEMPTS),
            JobKind::VideoGeneration => Self::new(VIDEO_POLL_INTERVAL, VIDEO_MAX_ATTEMPTS),
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_max_consecutive_status_errors(mut self, limit: Option<u32>) -> Self {
        self.max_consecutive_status_errors = limit;
        self
    }

    /// Worst-case wall time spent sleeping between checks.
    pub fn budget(&self) -> Duration {
        self.poll_interval
            .saturating_mul(self.max_attempts)
    }

    /// Reject configurations that could never make progress.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.max_attempts == 0 {
            return Err(CoreError::Validation(
                "max_attempts must be at least 1".into(),
            ));
        }
        if self.max_consecutive_status_errors == Some(0) {
            return Err(CoreError::Validation(
                "max_consecutive_status_errors must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
