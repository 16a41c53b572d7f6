//! Configuration for the webhook receiver.
//!
//! Values come from environment variables with sensible defaults, so the
//! receiver can start with nothing but `ELEVENLABS_WEBHOOK_SECRET` set.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Environment variable holding the shared HMAC secret.
pub const WEBHOOK_SECRET_ENV: &str = "ELEVENLABS_WEBHOOK_SECRET";
/// Environment variable holding the voice platform API key.
pub const API_KEY_ENV: &str = "ELEVENLABS_API_KEY";
/// Environment variable overriding the voice platform API base URL.
pub const API_BASE_URL_ENV: &str = "ELEVENLABS_BASE_URL";
/// Environment variable overriding the conversation store location.
pub const STORE_PATH_ENV: &str = "WEBHOOK_STORE_PATH";
/// Environment variable overriding the listen port.
pub const PORT_ENV: &str = "WEBHOOK_PORT";
/// Environment variable overriding the completed-call event marker.
pub const EVENT_TYPE_ENV: &str = "WEBHOOK_EVENT_TYPE";

/// Default voice platform API base URL.
pub const DEFAULT_API_BASE_URL: &str = "https://api.elevenlabs.io";
/// Default store file, relative to the working directory.
pub const DEFAULT_STORE_FILE: &str = "conversations.json";
/// Default listen port.
pub const DEFAULT_PORT: u16 = 3000;
/// Event type sent once a call has been transcribed and analysed.
pub const DEFAULT_COMPLETED_EVENT_TYPE: &str = "post_call_transcription";
/// User name stored when the call carried none.
pub const DEFAULT_USER: &str = "Anonymous";
/// Summary stored when the analysis carried none.
pub const DEFAULT_SUMMARY: &str = "No summary provided";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A value is out of range or empty.
    #[error("invalid configuration: {0}")]
    Invalid(String),
    /// The API base URL could not be parsed.
    #[error("invalid base url: {0}")]
    Url(#[from] url::ParseError),
}

/// Convenience result alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Runtime configuration for the webhook receiver.
#[derive(Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// Shared secret used to verify webhook signatures.
    pub webhook_secret: Option<String>,
    /// API key for outbound voice platform calls.
    pub api_key: Option<String>,
    /// Voice platform API base URL.
    pub api_base_url: String,
    /// JSON file holding every saved conversation.
    pub store_path: PathBuf,
    /// HTTP listen port.
    pub port: u16,
    /// Only events of this type are persisted.
    pub completed_event_type: String,
    /// Fallback user name.
    pub default_user: String,
    /// Fallback summary text.
    pub default_summary: String,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            webhook_secret: None,
            api_key: None,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            store_path: PathBuf::from(DEFAULT_STORE_FILE),
            port: DEFAULT_PORT,
            completed_event_type: DEFAULT_COMPLETED_EVENT_TYPE.to_string(),
            default_user: DEFAULT_USER.to_string(),
            default_summary: DEFAULT_SUMMARY.to_string(),
        }
    }
}

impl fmt::Debug for WebhookConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebhookConfig")
            .field("webhook_secret", &self.webhook_secret.as_ref().map(|_| "<redacted>"))
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("api_base_url", &self.api_base_url)
            .field("store_path", &self.store_path)
            .field("port", &self.port)
            .field("completed_event_type", &self.completed_event_type)
            .field("default_user", &self.default_user)
            .field("default_summary", &self.default_summary)
            .finish()
    }
}

impl WebhookConfig {
    /// Create a new config with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the configuration from the process environment.
    ///
    /// Unset or unparsable variables keep their defaults; an empty secret
    /// counts as unset.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub(crate) fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self {
            webhook_secret: non_empty(WEBHOOK_SECRET_ENV),
            api_key: non_empty(API_KEY_ENV),
            ..Self::default()
        };

        if let Some(base_url) = non_empty(API_BASE_URL_ENV) {
            config.api_base_url = base_url;
        }
        if let Some(path) = non_empty(STORE_PATH_ENV) {
            config.store_path = PathBuf::from(path);
        }
        if let Some(port) = non_empty(PORT_ENV).and_then(|p| p.parse().ok()) {
            config.port = port;
        }
        if let Some(event_type) = non_empty(EVENT_TYPE_ENV) {
            config.completed_event_type = event_type;
        }

        config
    }

    /// Set the webhook secret.
    #[must_use]
    pub fn with_webhook_secret(mut self, secret: impl Into<String>) -> Self {
        self.webhook_secret = Some(secret.into());
        self
    }

    /// Set the voice platform API key.
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set the store file location.
    #[must_use]
    pub fn with_store_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.store_path = path.into();
        self
    }

    /// Set the listen port.
    #[must_use]
    pub const fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the completed-call event marker.
    #[must_use]
    pub fn with_completed_event_type(mut self, event_type: impl Into<String>) -> Self {
        self.completed_event_type = event_type.into();
        self
    }

    /// Validate configuration invariants.
    ///
    /// # Errors
    /// Returns an error if any values are out of range or invalid.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.port == 0 {
            return Err(ConfigError::Invalid("port must be > 0".to_string()));
        }

        if self.completed_event_type.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "completed_event_type must not be empty".to_string(),
            ));
        }

        if self.store_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid(
                "store_path must not be empty".to_string(),
            ));
        }

        Url::parse(&self.api_base_url)?;

        Ok(())
    }
}
