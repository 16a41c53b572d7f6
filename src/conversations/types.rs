//! Types for persisted conversations.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::{DEFAULT_SUMMARY, DEFAULT_USER};

/// Simplified record of one completed voice conversation.
///
/// This is the shape written for new deliveries. Entries already on disk are
/// kept as raw JSON, see [`ConversationMap`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationRecord {
    /// Caller name, or the configured fallback.
    #[serde(default = "default_user")]
    pub user: String,
    /// Transcript exactly as delivered by the platform.
    #[serde(default)]
    pub transcript: Value,
    /// Analysis summary, or the configured fallback.
    #[serde(default = "default_summary")]
    pub summary: String,
    /// Call duration in seconds, as delivered.
    #[serde(default)]
    pub duration: Option<Value>,
    /// Call start as a Unix timestamp in seconds, as delivered.
    #[serde(default)]
    pub timestamp: Option<Value>,
    /// Call cost, as delivered.
    #[serde(default)]
    pub cost: Option<Value>,
}

fn default_user() -> String {
    DEFAULT_USER.to_string()
}

fn default_summary() -> String {
    DEFAULT_SUMMARY.to_string()
}

impl Default for ConversationRecord {
    fn default() -> Self {
        Self {
            user: default_user(),
            transcript: Value::Null,
            summary: default_summary(),
            duration: None,
            timestamp: None,
            cost: None,
        }
    }
}

/// Every saved conversation keyed by conversation id.
///
/// Entries are raw JSON so records written by older versions, whatever their
/// shape, survive a load-merge-save cycle untouched.
pub type ConversationMap = BTreeMap<String, Value>;

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_missing_fields_take_defaults() {
        let record: ConversationRecord = serde_json::from_value(json!({})).unwrap();
        assert_eq!(record.user, "Anonymous");
        assert_eq!(record.summary, "No summary provided");
        assert_eq!(record.transcript, Value::Null);
        assert!(record.duration.is_none());
    }

    #[test]
    fn test_mistyped_user_is_a_decode_error() {
        assert!(serde_json::from_value::<ConversationRecord>(json!({"user": 5})).is_err());
    }

    #[test]
    fn test_absent_metadata_serializes_as_null() {
        let value = serde_json::to_value(ConversationRecord::default()).unwrap();
        assert_eq!(
            value,
            json!({
                "user": "Anonymous",
                "transcript": null,
                "summary": "No summary provided",
                "duration": null,
                "timestamp": null,
                "cost": null
            })
        );
    }

    #[test]
    fn test_metadata_keeps_its_form() {
        let record: ConversationRecord = serde_json::from_value(json!({
            "duration": 42,
            "cost": "0.10",
        }))
        .unwrap();

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["duration"], json!(42));
        assert_eq!(value["cost"], json!("0.10"));
    }
}
