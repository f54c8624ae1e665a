use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use shortgen_core::error::CoreError;
use shortgen_core::ffmpeg::FfmpegError;
use shortgen_pipeline::{JobError, PipelineError};

use crate::sink::SinkError;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and adds job and HTTP-specific
/// variants. Implements [`IntoResponse`] to produce consistent JSON error
/// responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A generation job ended without an output.
    #[error(transparent)]
    Job(#[from] JobError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error(transparent)]
    Ffmpeg(#[from] FfmpegError),

    #[error(transparent)]
    Sink(#[from] SinkError),

    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Core(CoreError::Validation(errors.to_string()))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Core(core) => match core {
                CoreError::NotFound { entity, key } => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("{entity} '{key}' not found"),
                ),
                CoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                CoreError::Internal(msg) => internal(msg),
            },

            AppError::Job(err) => classify_job_error(err),

            AppError::Pipeline(err) => match err {
                PipelineError::StageFailed { cause, .. } => {
                    let (status, code, _) = classify_job_error(cause);
                    (status, code, err.to_string())
                }
                other => internal(&other.to_string()),
            },

            AppError::Ffmpeg(err) => match err {
                FfmpegError::InvalidArgument(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                other => internal(&other.to_string()),
            },

            AppError::Sink(err) => match err {
                SinkError::InvalidName(_) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", err.to_string())
                }
                other => internal(&other.to_string()),
            },
            AppError::InternalError(msg) => internal(msg),
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

/// Timeouts map to 504, every other job failure to 502. The message is
/// the job error verbatim.
fn classify_job_error(err: &JobError) -> (StatusCode, &'static str, String) {
    match err {
        JobError::TimedOut { .. } => (StatusCode::GATEWAY_TIMEOUT, "JOB_TIMED_OUT", err.to_string()),
        _ => (StatusCode::BAD_GATEWAY, "JOB_FAILED", err.to_string()),
    }
}

fn internal(msg: &str) -> (StatusCode, &'static str, String) {
    tracing::error!(error = %msg, "Internal error");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
    )
}
