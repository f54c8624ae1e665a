//! Provider adapter seam.
//!
//! A [`ProviderAdapter`] translates a generic [`JobRequest`] into one
//! provider-specific submit call and a provider status response into a
//! [`StatusReport`]. Adapters own no control flow: each method performs
//! exactly one outbound request and keeps no state between calls. Timing,
//! retry budgets and terminal-state interpretation belong to the poller.

use async_trait::async_trait;
use serde::Serialize;

use crate::types::JobRequest;

/// Normalised view of one provider status response.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusReport {
    /// `true` once the provider reports a final state.
    pub terminal: bool,
    /// Only meaningful when `terminal` is `true`.
    pub succeeded: bool,
    /// The provider's own status word (e.g. `"processing"`).
    pub provider_status: String,
    /// Opaque success payload, `Null` when absent.
    pub raw_output: serde_json::Value,
    /// Opaque failure payload, `Null` when absent.
    pub raw_error: serde_json::Value,
}

impl StatusReport {
    /// A non-terminal report carrying only the provider's status word.
    pub fn pending(provider_status: impl Into<String>) -> Self {
        Self {
            terminal: false,
            succeeded: false,
            provider_status: provider_status.into(),
            raw_output: serde_json::Value::Null,
            raw_error: serde_json::Value::Null,
        }
    }

    pub fn succeeded(provider_status: impl Into<String>, raw_output: serde_json::Value) -> Self {
        Self {
            terminal: true,
            succeeded: true,
            provider_status: provider_status.into(),
            raw_output,
            raw_error: serde_json::Value::Null,
        }
    }

    pub fn failed(provider_status: impl Into<String>, raw_error: serde_json::Value) -> Self {
        Self {
            terminal: true,
            succeeded: false,
            provider_status: provider_status.into(),
            raw_output: serde_json::Value::Null,
            raw_error,
        }
    }
}

/// The provider refused to create a job. Never retried.
#[derive(Debug, Clone, PartialEq, Serialize, thiserror::Error)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SubmissionError {
    /// Non-2xx response; status and body are kept verbatim.
    #[error("Provider rejected submission ({status}): {body}")]
    Rejected { status: u16, body: String },

    /// The request never produced a response (network, DNS, TLS).
    #[error("Submission request failed: {message}")]
    Transport { message: String },

    /// 2xx response that did not carry a job identifier.
    #[error("Malformed submission response: {message}")]
    MalformedResponse { message: String },
}

/// A single status check failed. Transient from the poller's view.
#[derive(Debug, Clone, PartialEq, Serialize, thiserror::Error)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StatusCheckError {
    #[error("Status check rejected ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("Status check request failed: {message}")]
    Transport { message: String },

    #[error("Malformed status response: {message}")]
    MalformedResponse { message: String },
}

/// Provider-specific request/response translation.
#[async_trait]
pub trait ProviderAdapter: Send + Sync + 'static {
    /// Short provider label used in logs and health output.
    fn name(&self) -> &str;

    /// Submit a job and return the provider-assigned identifier.
    async fn submit(&self, request: &JobRequest) -> Result<String, SubmissionError>;

    /// Fetch the current status of a previously submitted job.
    async fn check_status(&self, job_id: &str) -> Result<StatusReport, StatusCheckError>;
}
