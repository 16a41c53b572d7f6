//! Error types for webhook handling.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::conversations::StoreError;

/// Errors that can end a webhook delivery.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// Signature missing, malformed or not matching the body.
    #[error("Invalid signature")]
    InvalidSignature,

    /// Body is not a JSON event with a conversation id.
    #[error("Invalid payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),

    /// The conversation could not be written.
    #[error("Failed to persist conversation: {0}")]
    Store(#[from] StoreError),
}

impl WebhookError {
    /// HTTP status reported to the sender.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::InvalidSignature => StatusCode::UNAUTHORIZED,
            Self::InvalidPayload(_) => StatusCode::BAD_REQUEST,
            Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message placed in the response body. Storage details stay in the logs.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::Store(_) => "Failed to persist conversation".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({ "error": self.public_message() }));
        (self.status(), body).into_response()
    }
}
