//! Application state shared across all request handlers.

use std::sync::Arc;

use crate::config::WebhookConfig;
use crate::conversations::{ConversationStore, JsonFileConversationStore};
use crate::elevenlabs::ElevenLabsClient;

/// Shared application state.
pub struct AppState {
    /// Receiver configuration.
    pub config: WebhookConfig,
    /// Conversation store.
    pub store: Arc<dyn ConversationStore>,
    /// Voice platform client, built once at startup.
    pub elevenlabs: ElevenLabsClient,
}

impl AppState {
    /// Create the application state from a validated configuration.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid or the voice platform
    /// client cannot be created.
    pub fn new(config: WebhookConfig) -> Result<Arc<Self>, Box<dyn std::error::Error + Send + Sync>> {
        config.validate()?;

        let store: Arc<dyn ConversationStore> =
            Arc::new(JsonFileConversationStore::new(config.store_path.clone()));
        let elevenlabs = ElevenLabsClient::from_config(&config)
            .map_err(|e| format!("Failed to create ElevenLabs client: {e}"))?;

        Ok(Self::with_store(config, store, elevenlabs))
    }

    /// Assemble the state from already-built parts.
    #[must_use]
    pub fn with_store(
        config: WebhookConfig,
        store: Arc<dyn ConversationStore>,
        elevenlabs: ElevenLabsClient,
    ) -> Arc<Self> {
        Arc::new(Self {
            config,
            store,
            elevenlabs,
        })
    }
}
