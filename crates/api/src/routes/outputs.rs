//! Route definitions for stored generation records.

use axum::routing::get;
use axum::Router;

use crate::handlers::outputs;
use crate::state::AppState;

/// Routes mounted at `/outputs`.
///
/// ```text
/// GET    /                -> list_outputs
/// GET    /{name}          -> get_output
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(outputs::list_outputs))
        .route("/{name}", get(outputs::get_output))
}
