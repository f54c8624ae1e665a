use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use shortgen_core::ffmpeg::{self, StillVideoOptions};
use validator::Validate;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct StillVideoRequest {
    /// http(s) URL of the source image.
    #[validate(url(message = "image_url must be an http(s) URL"))]
    pub image_url: String,
    pub duration_secs: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct StillVideoResponse {
    pub path: String,
    pub duration_secs: f64,
}

/// POST /api/v1/generate/still-video
///
/// Loops a still image into a vertical MP4 under the media directory and
/// reports the probed duration.
pub async fn create_still_video(
    State(state): State<AppState>,
    Json(input): Json<StillVideoRequest>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;
    ffmpeg::check_remote_input(&input.image_url)?;

    let defaults = StillVideoOptions::default();
    let options = StillVideoOptions {
        duration_secs: input.duration_secs.unwrap_or(defaults.duration_secs),
        ..defaults
    };
    options.validate()?;

    let path = state.config.media_dir().join(format!(
        "still-{}.mp4",
        chrono::Utc::now().format("%Y%m%dT%H%M%S%.3fZ")
    ));
    ffmpeg::loop_still_image(&input.image_url, &path, &options).await?;
    let duration_secs = ffmpeg::probe_duration(&path).await?;

    tracing::info!(path = %path.display(), duration_secs, "Still video created");

    Ok(Json(DataResponse {
        data: StillVideoResponse {
            path: path.display().to_string(),
            duration_secs,
        },
    }))
}
