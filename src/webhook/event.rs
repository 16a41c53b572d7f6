//! Webhook payload types.
//!
//! Only the fields the receiver stores are modelled; everything else in the
//! payload is ignored. Optional fields are explicit `Option`s and defaults are
//! applied in one place, [`WebhookEvent::into_record`].

use serde::{Deserialize, Deserializer};
use serde_json::{Map, Number, Value};

use crate::conversations::ConversationRecord;

/// Inbound webhook event.
#[derive(Clone, Debug, Deserialize)]
pub struct WebhookEvent {
    /// Event type, e.g. `post_call_transcription`.
    #[serde(rename = "type", default)]
    pub event_type: Option<String>,
    /// Conversation payload.
    pub data: ConversationData,
}

/// Conversation payload of a webhook event.
#[derive(Clone, Debug, Deserialize)]
pub struct ConversationData {
    /// Platform conversation id; the store key. Numeric ids are keyed by
    /// their decimal form.
    #[serde(deserialize_with = "string_or_number")]
    pub conversation_id: String,
    /// Transcript, kept verbatim.
    #[serde(default)]
    pub transcript: Value,
    /// Post-call analysis.
    #[serde(default)]
    pub analysis: Option<Analysis>,
    /// Billing and timing metadata.
    #[serde(default)]
    pub metadata: Option<CallMetadata>,
    /// Data supplied by the client when the conversation started.
    #[serde(default)]
    pub conversation_initiation_client_data: Option<InitiationClientData>,
}

/// Post-call analysis.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Analysis {
    /// Generated summary of the transcript.
    #[serde(default)]
    pub transcript_summary: Option<Value>,
}

/// Call metadata.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct CallMetadata {
    /// Duration in seconds.
    #[serde(default)]
    pub call_duration_secs: Option<Value>,
    /// Start time as a Unix timestamp in seconds.
    #[serde(default)]
    pub start_time_unix_secs: Option<Value>,
    /// Billed cost.
    #[serde(default)]
    pub cost: Option<Value>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawConversationId {
    Text(String),
    Number(Number),
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match RawConversationId::deserialize(deserializer)? {
        RawConversationId::Text(id) => id,
        RawConversationId::Number(id) => id.to_string(),
    })
}

/// Client data sent when the conversation was initiated.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct InitiationClientData {
    /// Free-form variables injected into the agent prompt.
    #[serde(default)]
    pub dynamic_variables: Option<Map<String, Value>>,
}

impl WebhookEvent {
    /// Parse an event from a raw request body.
    ///
    /// # Errors
    /// Returns an error if the body is not JSON or lacks `data.conversation_id`.
    pub fn from_slice(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }

    /// Whether this event should be persisted.
    ///
    /// Events that carry no type at all are accepted.
    #[must_use]
    pub fn is_completed_call(&self, completed_type: &str) -> bool {
        self.event_type
            .as_deref()
            .is_none_or(|event_type| event_type == completed_type)
    }

    /// Caller name from the dynamic variables, if it is a non-empty string.
    #[must_use]
    pub fn user_name(&self) -> Option<&str> {
        self.data
            .conversation_initiation_client_data
            .as_ref()?
            .dynamic_variables
            .as_ref()?
            .get("user_name")?
            .as_str()
            .filter(|name| !name.is_empty())
    }

    /// Transcript summary, if it is a non-empty string.
    #[must_use]
    pub fn summary(&self) -> Option<&str> {
        self.data
            .analysis
            .as_ref()?
            .transcript_summary
            .as_ref()?
            .as_str()
            .filter(|summary| !summary.is_empty())
    }

    /// Split the event into its conversation id and the record to store.
    #[must_use]
    pub fn into_record(
        self,
        default_user: &str,
        default_summary: &str,
    ) -> (String, ConversationRecord) {
        let user = self.user_name().unwrap_or(default_user).to_string();
        let summary = self.summary().unwrap_or(default_summary).to_string();
        let metadata = self.data.metadata.unwrap_or_default();

        let record = ConversationRecord {
            user,
            transcript: self.data.transcript,
            summary,
            duration: metadata.call_duration_secs,
            timestamp: metadata.start_time_unix_secs,
            cost: metadata.cost,
        };

        (self.data.conversation_id, record)
    }
}
