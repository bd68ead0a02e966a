use axum::{extract::Extension, Json};
use serde::Serialize;

use crate::server::app::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    ready: bool,
    status_message: String,
    has_qr: bool,
}

#[derive(Serialize)]
pub struct RootResponse {
    status: &'static str,
    message: String,
}

/// Connection status, read from one snapshot so the three fields always agree.
pub async fn status_handler(Extension(state): Extension<AppState>) -> Json<StatusResponse> {
    let snapshot = state.session.snapshot();

    Json(StatusResponse {
        ready: snapshot.is_ready(),
        status_message: snapshot.status_message,
        has_qr: snapshot.has_pairing_token,
    })
}

/// Landing endpoint: `connected` once the session is ready, `waiting` otherwise.
pub async fn root_handler(Extension(state): Extension<AppState>) -> Json<RootResponse> {
    let snapshot = state.session.snapshot();

    Json(RootResponse {
        status: if snapshot.is_ready() {
            "connected"
        } else {
            "waiting"
        },
        message: snapshot.status_message,
    })
}
