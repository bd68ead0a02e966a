use axum::{extract::Extension, Json};
use serde::Serialize;

use crate::domains::session::phase::RESTARTING;
use crate::domains::session::RestartOutcome;
use crate::server::app::AppState;

#[derive(Serialize)]
pub struct RestartResponse {
    message: &'static str,
}

/// Operator restart. Answers before the new session is up.
pub async fn restart_handler(Extension(state): Extension<AppState>) -> Json<RestartResponse> {
    let message = match state.controller.restart().await {
        RestartOutcome::Started => RESTARTING,
        RestartOutcome::AlreadyInProgress => "Restart already in progress.",
    };

    Json(RestartResponse { message })
}
