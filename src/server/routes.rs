//! HTTP route handlers for the webhook receiver.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value, json};

use crate::webhook::{self, SIGNATURE_HEADER, WebhookError};

use super::state::AppState;

/// Path receiving webhook deliveries.
pub const WEBHOOK_PATH: &str = "/api/elevenlabs-webhook";

/// Create the API router with all routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route(WEBHOOK_PATH, get(webhook_liveness).post(receive_webhook))
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "voice-webhook",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Show that the webhook endpoint is online.
async fn webhook_liveness() -> impl IntoResponse {
    Json(json!({ "message": "Webhook endpoint is live" }))
}

/// Handle a webhook delivery.
///
/// The body is taken as raw bytes so the signature covers exactly what was sent.
async fn receive_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, WebhookError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());

    webhook::handle_delivery(&state.config, state.store.as_ref(), &body, signature).await?;

    Ok(Json(json!({ "received": true })))
}
