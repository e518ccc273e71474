//! Message model shared by the dispatch pipeline and its collaborators.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Store-assigned, monotonically increasing message identifier.
pub type MessageId = i64;

/// Hard upper bound on outgoing content, in characters.
pub const MAX_CONTENT_CHARS: usize = 160;

/// Upper bound on recipient length accepted by the transport, in characters.
pub const MAX_RECIPIENT_CHARS: usize = 20;

/// Proof of a successful send: the endpoint's identifier and when it was recorded.
///
/// Both halves are set together, so a message can never be half-delivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Delivery {
    #[serde(rename = "external_id")]
    pub delivery_id: String,
    pub sent_at: DateTime<Utc>,
}

/// Delivery state of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryState {
    Pending,
    Delivered,
}

/// A unit of work held by the record store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub id: MessageId,
    #[serde(rename = "to")]
    pub recipient: String,
    pub content: String,
    /// Present only once delivered.
    #[serde(flatten)]
    pub delivery: Option<Delivery>,
    #[serde(skip)]
    pub created_at: DateTime<Utc>,
    #[serde(skip)]
    pub updated_at: DateTime<Utc>,
}

impl Message {
    /// Build a pending message as the store would return it.
    pub fn pending(
        id: MessageId,
        recipient: impl Into<String>,
        content: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            recipient: recipient.into(),
            content: content.into(),
            delivery: None,
            created_at,
            updated_at: created_at,
        }
    }

    pub fn state(&self) -> DeliveryState {
        match self.delivery {
            Some(_) => DeliveryState::Delivered,
            None => DeliveryState::Pending,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.delivery.is_none()
    }

    pub fn delivery_id(&self) -> Option<&str> {
        self.delivery.as_ref().map(|d| d.delivery_id.as_str())
    }

    pub fn sent_at(&self) -> Option<DateTime<Utc>> {
        self.delivery.as_ref().map(|d| d.sent_at)
    }

    /// Content as it goes over the wire; the stored record is left untouched.
    pub fn outgoing_content(&self) -> &str {
        truncate_content(&self.content)
    }
}

/// Cut `content` to at most [`MAX_CONTENT_CHARS`] characters.
///
/// Counts characters, not bytes, so multi-byte text is never split mid-codepoint.
pub fn truncate_content(content: &str) -> &str {
    match content.char_indices().nth(MAX_CONTENT_CHARS) {
        Some((byte_idx, _)) => &content[..byte_idx],
        None => content,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_keeps_short_content() {
        assert_eq!(truncate_content("Hello"), "Hello");
        assert_eq!(truncate_content(""), "");
    }

    #[test]
    fn truncate_exact_bound_is_unchanged() {
        let content = "a".repeat(MAX_CONTENT_CHARS);
        assert_eq!(truncate_content(&content), content.as_str());
    }

    #[test]
    fn truncate_cuts_to_first_160_chars() {
        let content = format!("{}{}", "x".repeat(MAX_CONTENT_CHARS), "overflow");
        let truncated = truncate_content(&content);
        assert_eq!(truncated.chars().count(), MAX_CONTENT_CHARS);
        assert!(content.starts_with(truncated));
    }

    #[test]
    fn truncate_counts_chars_not_bytes() {
        let content = "é".repeat(MAX_CONTENT_CHARS + 5);
        let truncated = truncate_content(&content);
        assert_eq!(truncated.chars().count(), MAX_CONTENT_CHARS);
        assert_eq!(truncated.len(), MAX_CONTENT_CHARS * 2);
    }

    #[test]
    fn outgoing_content_does_not_mutate_record() {
        let long = "z".repeat(200);
        let message = Message::pending(1, "+1111111", long.clone(), Utc::now());
        assert_eq!(message.outgoing_content().chars().count(), MAX_CONTENT_CHARS);
        assert_eq!(message.content, long);
    }

    #[test]
    fn pending_message_has_no_delivery() {
        let message = Message::pending(7, "+1", "hi", Utc::now());
        assert_eq!(message.state(), DeliveryState::Pending);
        assert!(message.delivery_id().is_none());
        assert!(message.sent_at().is_none());
    }

    #[test]
    fn serializes_delivered_message_with_wire_names() {
        let sent_at = Utc::now();
        let mut message = Message::pending(3, "+2222222", "World", sent_at);
        message.delivery = Some(Delivery {
            delivery_id: "ext-1".to_string(),
            sent_at,
        });

        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["id"], 3);
        assert_eq!(value["to"], "+2222222");
        assert_eq!(value["content"], "World");
        assert_eq!(value["external_id"], "ext-1");
        assert!(value.get("sent_at").is_some());
        assert!(value.get("created_at").is_none());
        assert!(value.get("updated_at").is_none());
    }

    #[test]
    fn serializes_pending_message_without_delivery_fields() {
        let message = Message::pending(4, "+3", "x", Utc::now());
        let value = serde_json::to_value(&message).unwrap();
        assert!(value.get("external_id").is_none());
        assert!(value.get("sent_at").is_none());
    }
}
