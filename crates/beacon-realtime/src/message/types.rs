//! The one message shape carried in both directions.

use serde::{Deserialize, Serialize};

/// Numeric message type used to pick an inbound handler.
pub type MessageKind = u32;

/// A typed message. Immutable once built.
///
/// On the wire this is `{"type": <uint>, "content": <string>}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "type")]
    kind: MessageKind,
    content: String,
}

impl Message {
    /// Create a new message.
    pub fn new(kind: MessageKind, content: impl Into<String>) -> Self {
        Self {
            kind,
            content: content.into(),
        }
    }

    /// Message type.
    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    /// Message payload.
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Consume the message, returning its payload.
    pub fn into_content(self) -> String {
        self.content
    }
}
