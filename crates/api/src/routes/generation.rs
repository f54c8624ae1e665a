//! Route definitions for inline generation.

use axum::routing::post;
use axum::Router;

use crate::handlers::{generation, still_video};
use crate::state::AppState;

/// Routes mounted at `/generate`.
///
/// ```text
/// POST   /image           -> generate_image
/// POST   /video           -> generate_video
/// POST   /still-video     -> create_still_video
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/image", post(generation::generate_image))
        .route("/video", post(generation::generate_video))
        .route("/still-video", post(still_video::create_still_video))
}
