//! Outbound send-API requests.

use serde::Serialize;
use serde_json::Value;

/// Metadata attached to every plain text reply
pub const TEXT_METADATA: &str = "DEVELOPER_DEFINED_METADATA";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recipient {
    pub id: String,
}

/// One call to the send API: either a message or a sender action
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SendRequest {
    pub recipient: Recipient,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<OutgoingMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender_action: Option<SenderAction>,
}

impl SendRequest {
    pub fn message(recipient_id: &str, message: OutgoingMessage) -> Self {
        Self {
            recipient: Recipient {
                id: recipient_id.to_string(),
            },
            message: Some(message),
            sender_action: None,
        }
    }

    pub fn action(recipient_id: &str, action: SenderAction) -> Self {
        Self {
            recipient: Recipient {
                id: recipient_id.to_string(),
            },
            message: None,
            sender_action: Some(action),
        }
    }

    pub fn text(recipient_id: &str, text: impl Into<String>) -> Self {
        Self::message(recipient_id, OutgoingMessage::text(text))
    }

    pub fn recipient_id(&self) -> &str {
        &self.recipient.id
    }

    /// Text of the message, if this is a text message
    pub fn text_body(&self) -> Option<&str> {
        self.message.as_ref().and_then(|m| m.text.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct OutgoingMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment: Option<Attachment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quick_replies: Option<Vec<QuickReply>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<String>,
}

impl OutgoingMessage {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            metadata: Some(TEXT_METADATA.to_string()),
            ..Default::default()
        }
    }

    pub fn attachment(attachment: Attachment) -> Self {
        Self {
            attachment: Some(attachment),
            ..Default::default()
        }
    }

    pub fn with_quick_replies(text: impl Into<String>, quick_replies: Vec<QuickReply>) -> Self {
        Self {
            text: Some(text.into()),
            quick_replies: Some(quick_replies),
            ..Default::default()
        }
    }
}

/// Attachment serialized as `{"type": ..., "payload": ...}`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "lowercase")]
pub enum Attachment {
    Image { url: String },
    Audio { url: String },
    Video { url: String },
    File { url: String },
    Template(Value),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QuickReplyKind {
    Text,
    Location,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuickReply {
    pub content_type: QuickReplyKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl QuickReply {
    pub fn text(title: &str, payload: impl Into<String>) -> Self {
        Self {
            content_type: QuickReplyKind::Text,
            title: Some(title.to_string()),
            payload: Some(payload.into()),
            image_url: None,
        }
    }

    pub fn location() -> Self {
        Self {
            content_type: QuickReplyKind::Location,
            title: None,
            payload: None,
            image_url: None,
        }
    }

    pub fn with_image(mut self, image_url: &str) -> Self {
        self.image_url = Some(image_url.to_string());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SenderAction {
    MarkSeen,
    TypingOn,
    TypingOff,
}
