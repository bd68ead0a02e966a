use axum::{extract::Extension, http::StatusCode, Json};
use serde::Serialize;

use crate::domains::session::Phase;
use crate::server::app::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    status: String,
    phase: Phase,
    restart_in_progress: bool,
}

/// Health check endpoint
///
/// The process is healthy whenever it can answer; the transport phase is
/// reported for diagnosis but never turns this into a failure.
pub async fn health_handler(
    Extension(state): Extension<AppState>,
) -> (StatusCode, Json<HealthResponse>) {
    let snapshot = state.session.snapshot();

    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".to_string(),
            phase: snapshot.phase,
            restart_in_progress: snapshot.restart_in_progress,
        }),
    )
}
