//! Inbound webhook payloads.
//!
//! A POST to the webhook carries a batch: one entry per page, each with a list
//! of messaging events. Only the fields the bot reads are modelled; anything
//! else is ignored by serde.

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookPayload {
    pub object: String,
    #[serde(default)]
    pub entry: Vec<PageEntry>,
}

impl WebhookPayload {
    pub fn is_page_subscription(&self) -> bool {
        self.object == "page"
    }

    /// All messaging events of the batch, in delivery order
    pub fn into_events(self) -> impl Iterator<Item = MessagingEvent> {
        self.entry.into_iter().flat_map(|entry| entry.messaging)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PageEntry {
    pub id: String,
    #[serde(default)]
    pub time: i64,
    #[serde(default)]
    pub messaging: Vec<MessagingEvent>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Participant {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessagingEvent {
    pub sender: Participant,
    pub recipient: Participant,
    #[serde(default)]
    pub timestamp: Option<i64>,
    pub optin: Option<Optin>,
    pub message: Option<InboundMessage>,
    pub delivery: Option<Delivery>,
    pub postback: Option<Postback>,
    pub read: Option<Read>,
    pub account_linking: Option<AccountLinking>,
}

/// What a messaging event is about, checked in platform priority order
#[derive(Debug, Clone, Copy)]
pub enum EventKind<'a> {
    Authentication(&'a Optin),
    Message(&'a InboundMessage),
    Delivery(&'a Delivery),
    Postback(&'a Postback),
    Read(&'a Read),
    AccountLink(&'a AccountLinking),
    Unknown,
}

impl MessagingEvent {
    pub fn kind(&self) -> EventKind<'_> {
        if let Some(optin) = &self.optin {
            EventKind::Authentication(optin)
        } else if let Some(message) = &self.message {
            EventKind::Message(message)
        } else if let Some(delivery) = &self.delivery {
            EventKind::Delivery(delivery)
        } else if let Some(postback) = &self.postback {
            EventKind::Postback(postback)
        } else if let Some(read) = &self.read {
            EventKind::Read(read)
        } else if let Some(link) = &self.account_linking {
            EventKind::AccountLink(link)
        } else {
            EventKind::Unknown
        }
    }

    pub fn sender_id(&self) -> &str {
        &self.sender.id
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Optin {
    #[serde(rename = "ref")]
    pub pass_through: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InboundMessage {
    #[serde(default)]
    pub is_echo: bool,
    pub mid: Option<String>,
    pub app_id: Option<u64>,
    pub metadata: Option<String>,
    pub text: Option<String>,
    #[serde(default)]
    pub attachments: Vec<InboundAttachment>,
    pub quick_reply: Option<QuickReplyData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuickReplyData {
    pub payload: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InboundAttachment {
    #[serde(rename = "type")]
    pub kind: String,
    pub payload: Option<AttachmentPayload>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AttachmentPayload {
    pub url: Option<String>,
    pub coordinates: Option<SharedCoordinates>,
}

/// Coordinates of a location share; the platform spells longitude `long`
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct SharedCoordinates {
    pub lat: f64,
    pub long: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Delivery {
    #[serde(default)]
    pub mids: Vec<String>,
    #[serde(default)]
    pub watermark: i64,
    pub seq: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Postback {
    #[serde(default)]
    pub payload: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Read {
    #[serde(default)]
    pub watermark: i64,
    pub seq: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccountLinking {
    pub status: String,
    pub authorization_code: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_batched_payload() {
        let raw = r#"{
            "object": "page",
            "entry": [
                {"id": "p1", "time": 1, "messaging": [
                    {"sender": {"id": "u1"}, "recipient": {"id": "p1"}, "timestamp": 10,
                     "message": {"mid": "m1", "text": "@image"}},
                    {"sender": {"id": "u2"}, "recipient": {"id": "p1"},
                     "delivery": {"mids": ["m0"], "watermark": 9, "seq": 3}}
                ]},
                {"id": "p2", "time": 2, "messaging": [
                    {"sender": {"id": "u3"}, "recipient": {"id": "p2"},
                     "postback": {"payload": "DEVELOPER_DEFINED_PAYLOAD"}}
                ]}
            ]
        }"#;
        let payload: WebhookPayload = serde_json::from_str(raw).unwrap();
        assert!(payload.is_page_subscription());
        let events: Vec<_> = payload.into_events().collect();
        assert_eq!(events.len(), 3);
        assert!(matches!(events[0].kind(), EventKind::Message(m) if m.text.as_deref() == Some("@image")));
        assert!(matches!(events[1].kind(), EventKind::Delivery(d) if d.mids == vec!["m0"]));
        assert!(matches!(events[2].kind(), EventKind::Postback(_)));
    }

    #[test]
    fn test_optin_takes_priority() {
        let raw = r#"{"sender": {"id": "u1"}, "recipient": {"id": "p1"},
                      "optin": {"ref": "PASS_THROUGH"}, "message": {"text": "hi"}}"#;
        let event: MessagingEvent = serde_json::from_str(raw).unwrap();
        assert!(matches!(event.kind(), EventKind::Authentication(o) if o.pass_through.as_deref() == Some("PASS_THROUGH")));
    }

    #[test]
    fn test_location_attachment_coordinates() {
        let raw = r#"{"sender": {"id": "u1"}, "recipient": {"id": "p1"},
                      "message": {"attachments": [{"type": "location",
                        "payload": {"coordinates": {"lat": 37.48, "long": -122.15}}}]}}"#;
        let event: MessagingEvent = serde_json::from_str(raw).unwrap();
        let EventKind::Message(message) = event.kind() else {
            panic!("expected a message event");
        };
        let coords = message.attachments[0]
            .payload
            .as_ref()
            .and_then(|p| p.coordinates)
            .unwrap();
        assert_eq!(coords.long, -122.15);
    }

    #[test]
    fn test_unknown_event() {
        let raw = r#"{"sender": {"id": "u1"}, "recipient": {"id": "p1"}, "reaction": {}}"#;
        let event: MessagingEvent = serde_json::from_str(raw).unwrap();
        assert!(matches!(event.kind(), EventKind::Unknown));
    }
}
