use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Caller-supplied message content: an arbitrary JSON object.
pub type Payload = Map<String, Value>;

/// Lifecycle marker carried by every envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    Created,
    Updated,
}

/// Represents a message as it travels through a queue.
///
/// The envelope wraps the caller's payload with an id and timestamps. It is
/// serialized as a UTF-8 JSON object and is the only body format the client
/// reads back.
///
/// # Fields
///
/// - `id` - A v4 UUID string assigned at publish time. Updates keep it.
/// - `timestamp` - Unix seconds when the envelope was first published.
/// - `data` - The caller's payload.
/// - `status` - `created`, or `updated` after a republish through the update path.
/// - `updated_at` - Unix seconds of the last update, omitted until there is one.
///
/// # Example
///
/// ```rust
/// use mqcrud::broker::{Message, MessageStatus};
/// use serde_json::json;
///
/// let data = json!({"content": "hi"}).as_object().cloned().unwrap();
/// let msg = Message::new(data, 1_725_000_000);
/// assert_eq!(msg.status, MessageStatus::Created);
/// assert!(msg.updated_at.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub timestamp: i64,
    pub data: Payload,
    pub status: MessageStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<i64>,
}

impl Message {
    /// Wraps `data` in a fresh envelope with a newly generated id.
    pub fn new(data: Payload, timestamp: i64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp,
            data,
            status: MessageStatus::Created,
            updated_at: None,
        }
    }

    /// Returns the copy that the update path republishes.
    ///
    /// The id and original timestamp are kept.
    pub fn updated(self, data: Payload, updated_at: i64) -> Self {
        Self {
            data,
            status: MessageStatus::Updated,
            updated_at: Some(updated_at),
            ..self
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    pub fn from_slice(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }
}
