//! [`ProviderAdapter`] implementation for Replicate.

use async_trait::async_trait;
use shortgen_core::provider::{ProviderAdapter, StatusCheckError, StatusReport, SubmissionError};
use shortgen_core::types::JobRequest;

use crate::api::{ReplicateApi, ReplicateApiError};

#[async_trait]
impl ProviderAdapter for ReplicateApi {
    fn name(&self) -> &str {
        "replicate"
    }

    async fn submit(&self, request: &JobRequest) -> Result<String, SubmissionError> {
        let prediction = self
            .create_prediction(request)
            .await
            .map_err(submission_error)?;

        if prediction.id.is_empty() {
            return Err(SubmissionError::MalformedResponse {
                message: "prediction id is empty".into(),
            });
        }

        tracing::debug!(
            prediction_id = %prediction.id,
            model = %request.model,
            status = prediction.status.as_str(),
            "Prediction created",
        );
        Ok(prediction.id)
    }

    async fn check_status(&self, job_id: &str) -> Result<StatusReport, StatusCheckError> {
        let prediction = self
            .get_prediction(job_id)
            .await
            .map_err(status_check_error)?;
        Ok(prediction.into_status_report())
    }
}

fn submission_error(err: ReplicateApiError) -> SubmissionError {
    match err {
        ReplicateApiError::ApiError { status, body } => SubmissionError::Rejected { status, body },
        ReplicateApiError::Decode(message) => SubmissionError::MalformedResponse { message },
        other => SubmissionError::Transport {
            message: other.to_string(),
        },
    }
}

fn status_check_error(err: ReplicateApiError) -> StatusCheckError {
    match err {
        ReplicateApiError::ApiError { status, body } => StatusCheckError::Rejected { status, body },
        ReplicateApiError::Decode(message) => StatusCheckError::MalformedResponse { message },
        other => StatusCheckError::Transport {
            message: other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn api_errors_map_to_rejections_verbatim() {
        let err = submission_error(ReplicateApiError::ApiError {
            status: 422,
            body: r#"{"detail":"Invalid version"}"#.into(),
        });
        assert_eq!(
            err,
            SubmissionError::Rejected {
                status: 422,
                body: r#"{"detail":"Invalid version"}"#.into(),
            }
        );
    }

    #[test]
    fn decode_errors_map_to_malformed() {
        assert_matches!(
            status_check_error(ReplicateApiError::Decode("missing field `status`".into())),
            StatusCheckError::MalformedResponse { .. }
        );
    }

    #[test]
    fn io_errors_map_to_transport() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        assert_matches!(
            submission_error(ReplicateApiError::Io(io)),
            SubmissionError::Transport { .. }
        );
    }
}
