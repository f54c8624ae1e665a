use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use shortgen_core::error::CoreError;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::sink::OutputSink;
use crate::state::AppState;

fn sink(state: &AppState) -> AppResult<&OutputSink> {
    state.sink.as_deref().ok_or(AppError::Core(CoreError::NotFound {
        entity: "Output directory",
        key: "OUTPUT_DIR".into(),
    }))
}

/// GET /api/v1/outputs
///
/// Lists stored generation records, newest first.
pub async fn list_outputs(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let records = sink(&state)?.list().await?;
    Ok(Json(DataResponse { data: records }))
}

/// GET /api/v1/outputs/{name}
pub async fn get_output(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> AppResult<impl IntoResponse> {
    let content = sink(&state)?
        .read(&name)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Output",
            key: name,
        }))?;
    Ok(Json(DataResponse { data: content }))
}
