//! Replicate prediction message types.
//!
//! Replicate reports every prediction with the same JSON shape on both the
//! create and the get endpoints:
//! `{"id": "...", "status": "<state>", "output": ..., "error": ...}`.

use serde::{Deserialize, Serialize};
use shortgen_core::provider::StatusReport;

/// Lifecycle states reported by Replicate.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(from = "String", into = "String")]
pub enum PredictionStatus {
    Starting,
    Processing,
    Succeeded,
    Failed,
    Canceled,
    /// Any status word this client does not know yet, kept verbatim.
    /// Treated as running.
    Unknown(String),
}

impl From<String> for PredictionStatus {
    fn from(word: String) -> Self {
        match word.as_str() {
            "starting" => PredictionStatus::Starting,
            "processing" => PredictionStatus::Processing,
            "succeeded" => PredictionStatus::Succeeded,
            "failed" => PredictionStatus::Failed,
            "canceled" => PredictionStatus::Canceled,
            _ => PredictionStatus::Unknown(word),
        }
    }
}

impl From<PredictionStatus> for String {
    fn from(status: PredictionStatus) -> Self {
        match status {
            PredictionStatus::Unknown(word) => word,
            known => known.as_str().to_string(),
        }
    }
}

impl PredictionStatus {
    /// The status word as Replicate reported it.
    pub fn as_str(&self) -> &str {
        match self {
            PredictionStatus::Starting => "starting",
            PredictionStatus::Processing => "processing",
            PredictionStatus::Succeeded => "succeeded",
            PredictionStatus::Failed => "failed",
            PredictionStatus::Canceled => "canceled",
            PredictionStatus::Unknown(word) => word,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PredictionStatus::Succeeded | PredictionStatus::Failed | PredictionStatus::Canceled
        )
    }
}

/// A prediction as returned by `POST /v1/predictions` and
/// `GET /v1/predictions/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct Prediction {
    pub id: String,
    pub status: PredictionStatus,
    /// Model-specific output: a URL, a list of URLs or an object.
    #[serde(default)]
    pub output: serde_json::Value,
    /// Failure description, usually a string.
    #[serde(default)]
    pub error: serde_json::Value,
    #[serde(default)]
    pub logs: Option<String>,
}

impl Prediction {
    /// Translate into the provider-neutral [`StatusReport`].
    pub fn into_status_report(self) -> StatusReport {
        let word = self.status.as_str().to_string();
        match self.status {
            PredictionStatus::Succeeded => StatusReport::succeeded(word, self.output),
            PredictionStatus::Failed => StatusReport::failed(word, self.error),
            PredictionStatus::Canceled => {
                let error = if self.error.is_null() {
                    serde_json::Value::from("prediction was canceled")
                } else {
                    self.error
                };
                StatusReport::failed(word, error)
            }
            PredictionStatus::Starting
            | PredictionStatus::Processing
            | PredictionStatus::Unknown(_) => StatusReport::pending(word),
        }
    }
}

/// Error body Replicate returns on rejected requests (`{"detail": "..."}`).
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorDetail {
    pub detail: String,
}
