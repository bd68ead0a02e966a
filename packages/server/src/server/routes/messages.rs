use axum::{
    extract::{rejection::JsonRejection, Extension},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::domains::messaging::OutboundMessageRequest;
use crate::server::app::AppState;
use crate::server::error::ApiError;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    #[serde(default)]
    phone_number: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageResponse {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message_id: Option<String>,
}

pub async fn send_message_handler(
    Extension(state): Extension<AppState>,
    payload: Result<Json<SendMessageRequest>, JsonRejection>,
) -> Result<Json<SendMessageResponse>, ApiError> {
    let Json(payload) =
        payload.map_err(|e| ApiError::BadRequest(format!("Invalid request body: {}", e.body_text())))?;

    let request = OutboundMessageRequest::new(
        payload.phone_number.unwrap_or_default(),
        payload.message.unwrap_or_default(),
    );

    let ack = state.dispatcher.dispatch(&request).await?;

    Ok(Json(SendMessageResponse {
        success: true,
        message_id: ack.message_id,
    }))
}
