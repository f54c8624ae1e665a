//! Handlers that run generation jobs inline and answer once they finish.
//!
//! Routes:
//! - `POST /generate/image` -- text to image
//! - `POST /generate/video` -- text to image to video, as a two-stage pipeline

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use shortgen_core::error::CoreError;
use shortgen_core::types::JobKind;
use shortgen_pipeline::{Job, OutputRef, Stage, StageTemplate};
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::handlers::record_generation;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct GenerateImageRequest {
    #[validate(length(min = 1, max = 2000, message = "prompt must be 1-2000 characters"))]
    pub prompt: String,
    /// Catalog key; defaults to the configured image model.
    pub model: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GenerateImageResponse {
    pub job: Job,
    pub image_url: OutputRef,
}

#[derive(Debug, Deserialize, Validate)]
pub struct GenerateVideoRequest {
    #[validate(length(min = 1, max = 2000, message = "prompt must be 1-2000 characters"))]
    pub prompt: String,
    pub image_model: Option<String>,
    pub video_model: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GenerateVideoResponse {
    pub image_url: OutputRef,
    pub video_url: OutputRef,
    pub jobs: Vec<Job>,
}

/// POST /api/v1/generate/image
///
/// Submits one image job and polls it to completion. A failed job maps to
/// 502 and a timed-out one to 504.
pub async fn generate_image(
    State(state): State<AppState>,
    Json(input): Json<GenerateImageRequest>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;

    let kind = JobKind::ImageGeneration;
    let entry = state.catalog.resolve(input.model.as_deref(), kind)?;
    let request = entry.build_request(Some(&input.prompt))?;

    tracing::info!(model = %entry.key, "Starting inline image generation");
    let job = state.poller(kind).run(kind, request).await;

    let image_url = match job.result() {
        Some(Ok(output)) => output.clone(),
        Some(Err(e)) => return Err(AppError::Job(e.clone())),
        None => return Err(AppError::InternalError("job finished without a result".into())),
    };

    record_generation(
        state.sink.as_deref(),
        "image",
        Some(&input.prompt),
        std::slice::from_ref(&image_url),
        std::slice::from_ref(&job),
    )
    .await;

    Ok(Json(DataResponse {
        data: GenerateImageResponse { job, image_url },
    }))
}

/// POST /api/v1/generate/video
///
/// Generates a still from the prompt, then feeds it to the video model's
/// image input. The video stage is never submitted if the image stage
/// fails.
pub async fn generate_video(
    State(state): State<AppState>,
    Json(input): Json<GenerateVideoRequest>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;

    let image_entry = state
        .catalog
        .resolve(input.image_model.as_deref(), JobKind::ImageGeneration)?;
    let video_entry = state
        .catalog
        .resolve(input.video_model.as_deref(), JobKind::VideoGeneration)?;
    let image_field = video_entry.image_field.as_deref().ok_or_else(|| {
        CoreError::Validation(format!(
            "Model '{}' does not accept an input image",
            video_entry.key
        ))
    })?;

    let stages = vec![
        Stage::new(
            JobKind::ImageGeneration,
            StageTemplate::from_request(image_entry.build_request(Some(&input.prompt))?),
        ),
        Stage::new(
            JobKind::VideoGeneration,
            StageTemplate::from_request(video_entry.build_request(Some(&input.prompt))?)
                .chained(image_field),
        ),
    ];

    tracing::info!(
        image_model = %image_entry.key,
        video_model = %video_entry.key,
        "Starting inline video pipeline",
    );
    let output = state.pipeline().run(stages).await?;

    let (Some(image_url), Some(video_url)) = (output.outputs.first(), output.headline()) else {
        return Err(AppError::InternalError("pipeline produced no outputs".into()));
    };
    let (image_url, video_url) = (image_url.clone(), video_url.clone());

    record_generation(
        state.sink.as_deref(),
        "video",
        Some(&input.prompt),
        &output.outputs,
        &output.jobs,
    )
    .await;

    Ok(Json(DataResponse {
        data: GenerateVideoResponse {
            image_url,
            video_url,
            jobs: output.jobs,
        },
    }))
}
