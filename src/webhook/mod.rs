//! Webhook delivery handling.
//!
//! A delivery goes through:
//! - signature verification against the shared secret
//! - payload parsing
//! - event-type filtering
//! - record extraction with defaults
//! - an upsert into the conversation store

pub mod error;
pub mod event;
pub mod signature;

pub use error::WebhookError;
pub use event::WebhookEvent;
pub use signature::{SIGNATURE_HEADER, sign, verify};

use crate::config::WebhookConfig;
use crate::conversations::ConversationStore;

/// Result of an accepted delivery.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// The conversation was written to the store.
    Saved {
        /// Stored conversation id.
        conversation_id: String,
        /// Stored user name.
        user: String,
    },
    /// The event type is not persisted.
    Ignored {
        /// Type carried by the event.
        event_type: String,
    },
}

/// Verify, parse and persist one webhook delivery.
///
/// # Errors
/// Returns [`WebhookError::InvalidSignature`] before touching the store when
/// the signature does not verify, [`WebhookError::InvalidPayload`] for bodies
/// that are not events, and [`WebhookError::Store`] when the write fails.
pub async fn handle_delivery(
    config: &WebhookConfig,
    store: &dyn ConversationStore,
    body: &[u8],
    signature_header: Option<&str>,
) -> Result<DeliveryOutcome, WebhookError> {
    if !verify(config.webhook_secret.as_deref(), body, signature_header) {
        tracing::warn!("Rejected webhook delivery: invalid signature");
        return Err(WebhookError::InvalidSignature);
    }

    let event = WebhookEvent::from_slice(body).map_err(|e| {
        tracing::warn!("Rejected webhook delivery: {e}");
        WebhookError::InvalidPayload(e)
    })?;

    if !event.is_completed_call(&config.completed_event_type) {
        let event_type = event.event_type.unwrap_or_default();
        tracing::info!(
            "Ignoring {event_type} event for conversation {}",
            event.data.conversation_id
        );
        return Ok(DeliveryOutcome::Ignored { event_type });
    }

    let (conversation_id, record) =
        event.into_record(&config.default_user, &config.default_summary);
    let user = record.user.clone();

    store
        .upsert(conversation_id.clone(), record)
        .await
        .map_err(|e| {
            tracing::error!("Failed to save conversation {conversation_id}: {e}");
            WebhookError::Store(e)
        })?;

    tracing::info!("Conversation {conversation_id} saved for user: {user}");
    Ok(DeliveryOutcome::Saved {
        conversation_id,
        user,
    })
}
