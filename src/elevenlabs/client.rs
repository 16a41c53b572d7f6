//! ElevenLabs REST client.

use std::fmt;
use std::time::Duration;

use reqwest::StatusCode;
use serde_json::Value;
use url::Url;

use crate::config::WebhookConfig;

use super::error::{ClientError, ClientResult};

/// Header carrying the API key.
const API_KEY_HEADER: &str = "xi-api-key";
/// Request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
/// Connection timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// API-key authenticated client for the voice platform.
#[derive(Clone)]
pub struct ElevenLabsClient {
    http: reqwest::Client,
    base_url: Url,
    api_key: Option<String>,
}

impl fmt::Debug for ElevenLabsClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElevenLabsClient")
            .field("base_url", &self.base_url.as_str())
            .field("has_api_key", &self.api_key.is_some())
            .finish_non_exhaustive()
    }
}

impl ElevenLabsClient {
    /// Create a client for `base_url`.
    ///
    /// # Errors
    /// Returns an error if the URL is invalid or the HTTP client cannot be built.
    pub fn new(api_key: Option<String>, base_url: &str) -> ClientResult<Self> {
        let base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::UnusableBaseUrl(base_url.to_string()));
        }

        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| ClientError::HttpClient(e.to_string()))?;

        Ok(Self {
            http,
            base_url,
            api_key,
        })
    }

    /// Create a client from the receiver configuration.
    ///
    /// # Errors
    /// Returns an error if the configured base URL is invalid.
    pub fn from_config(config: &WebhookConfig) -> ClientResult<Self> {
        Self::new(config.api_key.clone(), &config.api_base_url)
    }

    /// Whether an API key is configured.
    #[must_use]
    pub const fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// URL of a conversation resource.
    ///
    /// # Errors
    /// Returns an error if the base URL cannot carry path segments.
    pub fn conversation_url(&self, conversation_id: &str) -> ClientResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ClientError::UnusableBaseUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(["v1", "convai", "conversations", conversation_id]);
        Ok(url)
    }

    /// Fetch the full conversation details held by the platform.
    ///
    /// # Errors
    /// Returns an error if no API key is configured, the request fails, or the
    /// API answers with a non-success status.
    pub async fn get_conversation(&self, conversation_id: &str) -> ClientResult<Value> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| ClientError::ApiKeyRequired("ElevenLabs".to_string()))?;

        let url = self.conversation_url(conversation_id)?;
        tracing::debug!("Fetching conversation {conversation_id}");

        let response = self
            .http
            .get(url)
            .header(API_KEY_HEADER, api_key)
            .header("Accept", "application/json")
            .send()
            .await?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(ClientError::AccessDenied(
                "Invalid ElevenLabs API key".to_string(),
            )),
            StatusCode::NOT_FOUND => Err(ClientError::NotFound(conversation_id.to_string())),
            status if !status.is_success() => Err(ClientError::Status(status.as_u16())),
            _ => Ok(response.json().await?),
        }
    }
}
