//! The triggering message of a callback invocation.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

static NEXT_MESSAGE_ID: AtomicU64 = AtomicU64::new(1);

/// Identifier of an emitted message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    /// Creates an identifier from an existing value (e.g. a broker delivery tag).
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a process-unique identifier.
    pub fn generate() -> Self {
        Self(format!("msg-{}", NEXT_MESSAGE_ID.fetch_add(1, Ordering::Relaxed)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MessageId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// A message emitted by a source: an opaque payload plus metadata attributes.
///
/// The engine never interprets the payload; it only passes the message through
/// to the callback that handles its outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceMessage {
    id: MessageId,
    payload: Value,
    #[serde(default)]
    attributes: Map<String, Value>,
}

impl SourceMessage {
    /// Creates a message with a generated id and no attributes.
    pub fn new(payload: impl Into<Value>) -> Self {
        Self {
            id: MessageId::generate(),
            payload: payload.into(),
            attributes: Map::new(),
        }
    }

    /// Replaces the generated id.
    pub fn with_id(mut self, id: impl Into<MessageId>) -> Self {
        self.id = id.into();
        self
    }

    /// Adds a metadata attribute.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn id(&self) -> &MessageId {
        &self.id
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    pub fn attributes(&self) -> &Map<String, Value> {
        &self.attributes
    }

    /// Returns a single attribute, if present.
    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }
}
