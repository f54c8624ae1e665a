use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;

use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/models
///
/// Lists every catalog entry with its kind and provider model reference.
pub async fn list_models(State(state): State<AppState>) -> impl IntoResponse {
    let models: Vec<_> = state.catalog.entries().cloned().collect();
    Json(DataResponse { data: models })
}
