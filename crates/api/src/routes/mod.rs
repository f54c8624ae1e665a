pub mod generation;
pub mod health;
pub mod jobs;
pub mod outputs;

use axum::routing::get;
use axum::Router;

use crate::handlers;
use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /models                                          list catalog (GET)
///
/// /generate/image                                  text -> image, inline (POST)
/// /generate/video                                  text -> image -> video, inline (POST)
/// /generate/still-video                            loop a still image into MP4 (POST)
///
/// /jobs                                            start background job (POST)
/// /jobs/{id}                                       job snapshot (GET)
///
/// /outputs                                         stored records (GET)
/// /outputs/{name}                                  one stored record (GET)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/models", get(handlers::models::list_models))
        .nest("/generate", generation::router())
        .nest("/jobs", jobs::router())
        .nest("/outputs", outputs::router())
}
