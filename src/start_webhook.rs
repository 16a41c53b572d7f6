//! Startup helpers for the webhook receiver.

use std::process::ExitCode;
use std::sync::Arc;

use crate::config::WebhookConfig;
use crate::server::{self, AppState};

/// Run the receiver until Ctrl+C.
///
/// # Returns
/// `ExitCode::SUCCESS` on graceful shutdown, `1` on failure.
#[must_use]
pub fn run() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("Starting voice webhook receiver v{}", env!("CARGO_PKG_VERSION"));

    let state = match initialize() {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Failed to create state: {e}");
            return ExitCode::from(1);
        }
    };

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("Failed to create runtime: {e}");
            return ExitCode::from(1);
        }
    };

    if let Err(e) = rt.block_on(server::run_server_with_shutdown(state, shutdown_signal())) {
        tracing::error!("Server error: {e}");
        return ExitCode::from(1);
    }

    tracing::info!("Webhook receiver stopped");
    ExitCode::SUCCESS
}

/// Load configuration from the environment and build the application state.
///
/// # Errors
/// Returns an error if the configuration is invalid or state creation fails.
pub fn initialize() -> Result<Arc<AppState>, Box<dyn std::error::Error + Send + Sync>> {
    let config = WebhookConfig::from_env();
    tracing::info!("Conversation store: {}", config.store_path.display());

    if config.webhook_secret.is_none() {
        tracing::warn!("No webhook secret configured; every delivery will be rejected");
    }

    let state = AppState::new(config).map_err(|e| format!("Failed to create state: {e}"))?;
    if !state.elevenlabs.has_api_key() {
        tracing::info!("No ElevenLabs API key configured; outbound calls are disabled");
    }

    Ok(state)
}

/// Resolve when the process receives Ctrl+C.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
