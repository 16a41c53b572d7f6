//! Outbound client for the voice conversation platform.
//!
//! The client is built once at startup, never mutated afterwards, and shared
//! read-only by every request through the application state.

pub mod client;
pub mod error;

pub use client::ElevenLabsClient;
pub use error::{ClientError, ClientResult};
