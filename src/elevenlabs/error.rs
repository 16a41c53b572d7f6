//! Error types for the voice platform client.

use thiserror::Error;

/// Errors returned by [`super::ElevenLabsClient`].
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    HttpRequest(#[from] reqwest::Error),

    /// HTTP client could not be built.
    #[error("HTTP client error: {0}")]
    HttpClient(String),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Base URL cannot carry path segments.
    #[error("Base URL cannot be used for API paths: {0}")]
    UnusableBaseUrl(String),

    /// No API key was configured.
    #[error("API key required for {0}")]
    ApiKeyRequired(String),

    /// The API rejected the key.
    #[error("Access denied: {0}")]
    AccessDenied(String),

    /// The requested conversation does not exist.
    #[error("Conversation not found: {0}")]
    NotFound(String),

    /// Any other non-success status.
    #[error("API returned status {0}")]
    Status(u16),
}

/// Convenience result alias for client operations.
pub type ClientResult<T> = Result<T, ClientError>;
