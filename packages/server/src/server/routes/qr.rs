use axum::{extract::Extension, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::server::app::AppState;
use crate::server::error::{ApiError, QrError};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QrResponse {
    qr: String,
    qr_image: String,
    issued_at: DateTime<Utc>,
}

/// Current pairing code, raw and rendered.
///
/// No token is a normal condition (already paired, or the transport has not
/// issued one yet) and answers 404 so callers can poll.
pub async fn qr_handler(Extension(state): Extension<AppState>) -> Result<Json<QrResponse>, ApiError> {
    let token = state.session.pairing_token().ok_or(QrError::NoPairingToken)?;

    let qr_image = state
        .renderer
        .encode_to_image(&token.payload)
        .await
        .map_err(|e| QrError::Render(e.to_string()))?;

    Ok(Json(QrResponse {
        qr: token.payload,
        qr_image,
        issued_at: token.issued_at,
    }))
}
