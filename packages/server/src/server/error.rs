//! HTTP error responses.
//!
//! Every failure leaves the server as `{ "error": ..., "details": ... }` with
//! `details` only present when there is an underlying cause worth reporting.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::domains::messaging::DispatchError;

/// Why a pairing code could not be served.
#[derive(Debug, Error)]
pub enum QrError {
    #[error("QR code not available yet")]
    NoPairingToken,

    #[error("failed to render QR code: {0}")]
    Render(String),
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    ServiceUnavailable(String),

    #[error("{error}: {details}")]
    Internal { error: String, details: String },
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::BadRequest(error) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    error,
                    details: None,
                },
            ),
            ApiError::NotFound(error) => (
                StatusCode::NOT_FOUND,
                ErrorBody {
                    error,
                    details: None,
                },
            ),
            ApiError::ServiceUnavailable(error) => (
                StatusCode::SERVICE_UNAVAILABLE,
                ErrorBody {
                    error,
                    details: None,
                },
            ),
            ApiError::Internal { error: message, details } => {
                error!(error = %message, details = %details, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        error: message,
                        details: Some(details),
                    },
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

impl From<DispatchError> for ApiError {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::InvalidRequest(reason) => ApiError::BadRequest(reason),
            DispatchError::NotReady(_) => {
                ApiError::ServiceUnavailable("Client is not ready".to_string())
            }
            DispatchError::Transport(details) => ApiError::Internal {
                error: "Failed to send message".to_string(),
                details,
            },
        }
    }
}

impl From<QrError> for ApiError {
    fn from(err: QrError) -> Self {
        match err {
            QrError::NoPairingToken => ApiError::NotFound("QR code not available yet".to_string()),
            QrError::Render(details) => ApiError::Internal {
                error: "Failed to generate QR code".to_string(),
                details,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_errors_map_to_status_codes() {
        let cases = [
            (
                DispatchError::InvalidRequest("phoneNumber is required".to_string()),
                StatusCode::BAD_REQUEST,
            ),
            (
                DispatchError::NotReady("client is disconnected".to_string()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                DispatchError::Transport("socket closed".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            let response = ApiError::from(err.clone()).into_response();
            assert_eq!(response.status(), expected, "{err}");
        }
    }

    #[test]
    fn test_missing_token_is_not_found() {
        let response = ApiError::from(QrError::NoPairingToken).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
