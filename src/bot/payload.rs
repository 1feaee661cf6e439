//! Structured quick-reply payloads.
//!
//! Invitations carry their intent as a JSON string inside the quick reply;
//! the platform hands the string back untouched when the user taps it.

use serde::{Deserialize, Serialize};

pub const MEET_PAYLOAD_TYPE: &str = "meet";
pub const STATUS_ACCEPTED: &str = "accepted";
pub const STATUS_DECLINED: &str = "declined";

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QuickReplyPayload {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub event: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

impl QuickReplyPayload {
    pub fn meet(status: &str, user: &str, event: &str, group: &str) -> Self {
        Self {
            kind: MEET_PAYLOAD_TYPE.to_string(),
            status: status.to_string(),
            user: user.to_string(),
            event: event.to_string(),
            group: Some(group.to_string()),
        }
    }

    pub fn parse(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    pub fn encode(&self) -> String {
        // Plain strings and an optional string always serialize
        serde_json::to_string(self).unwrap_or_default()
    }

    pub fn is_meet(&self) -> bool {
        self.kind == MEET_PAYLOAD_TYPE
    }

    /// Anything other than an explicit decline counts as an accept
    pub fn is_declined(&self) -> bool {
        self.status == STATUS_DECLINED
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_is_lossless() {
        let payload = QuickReplyPayload::meet(STATUS_ACCEPTED, "u1", "Friday \"drinks\"", "pub crawl");
        let parsed = QuickReplyPayload::parse(&payload.encode()).unwrap();
        assert_eq!(parsed, payload);
    }

    #[test]
    fn test_parses_payload_without_group() {
        let raw = r#"{"type":"meet", "status":"accepted", "user":"u1", "event":"hike"}"#;
        let parsed = QuickReplyPayload::parse(raw).unwrap();
        assert!(parsed.is_meet());
        assert!(!parsed.is_declined());
        assert_eq!(parsed.group, None);
    }

    #[test]
    fn test_rejects_non_json() {
        assert!(QuickReplyPayload::parse("DEVELOPER_DEFINED_PAYLOAD_FOR_PICKING_ACTION").is_err());
        assert!(QuickReplyPayload::parse("{\"type\": ").is_err());
    }
}
