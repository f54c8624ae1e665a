//! Handlers for the `/jobs` resource.
//!
//! Jobs started here run on background tasks; clients poll
//! `GET /jobs/{id}` for snapshots.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use shortgen_core::error::CoreError;
use shortgen_core::types::JobKind;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::handlers::record_generation;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct SubmitJobRequest {
    /// `image-generation` / `video-generation` (or `image` / `video`).
    pub kind: String,
    #[validate(length(min = 1, max = 2000, message = "prompt must be 1-2000 characters"))]
    pub prompt: Option<String>,
    pub model: Option<String>,
    /// Source image for image-to-video models.
    #[validate(url(message = "image_url must be a URL"))]
    pub image_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SubmitJobResponse {
    pub id: Uuid,
    pub kind: JobKind,
    pub model: String,
}

/// POST /api/v1/jobs
///
/// Starts a job in the background and returns 202 with its registry id.
pub async fn submit_job(
    State(state): State<AppState>,
    Json(input): Json<SubmitJobRequest>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;

    let kind: JobKind = input.kind.parse()?;
    let entry = state.catalog.resolve(input.model.as_deref(), kind)?;
    let mut request = entry.build_request(input.prompt.as_deref())?;
    if let Some(field) = &entry.image_field {
        let image_url = input.image_url.as_deref().ok_or_else(|| {
            CoreError::Validation(format!("Model '{}' requires image_url", entry.key))
        })?;
        request.input.insert(field.clone(), image_url.into());
    }

    let handle = state.poller(kind).spawn(kind, request);

    if let Some(sink) = state.sink.clone() {
        let mut updates = handle.subscribe();
        let prompt = input.prompt.clone();
        tokio::spawn(async move {
            let Ok(job) = updates.wait_for(|job| job.is_terminal()).await.map(|j| j.clone())
            else {
                return;
            };
            if let Some(output) = job.output().cloned() {
                record_generation(
                    Some(sink.as_ref()),
                    kind.as_str(),
                    prompt.as_deref(),
                    std::slice::from_ref(&output),
                    std::slice::from_ref(&job),
                )
                .await;
            }
        });
    }

    let id = state.jobs.insert(handle).await;
    tracing::info!(registry_id = %id, kind = %kind, model = %entry.key, "Background job started");

    Ok((
        StatusCode::ACCEPTED,
        Json(DataResponse {
            data: SubmitJobResponse {
                id,
                kind,
                model: entry.key.clone(),
            },
        }),
    ))
}

/// GET /api/v1/jobs/{id}
///
/// Returns the latest snapshot of a background job.
pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let job = state
        .jobs
        .snapshot(&id)
        .await
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Job",
            key: id.to_string(),
        }))?;

    Ok(Json(DataResponse { data: job }))
}
