//! Conversation persistence.
//!
//! Provides the record type written for each completed call and the
//! JSON-file store that keeps every record keyed by conversation id.

pub mod store;
pub mod types;

pub use store::{ConversationStore, JsonFileConversationStore, StoreError, StoreResult};
pub use types::{ConversationMap, ConversationRecord};
