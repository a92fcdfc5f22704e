//! Message envelope (JSON text frames).
//!
//! Inbound envelopes are parsed permissively: only `type` is required and
//! unknown fields are ignored, so newer servers can add fields freely.
//! Outbound envelopes are built from an `OutboundMessage`, which substitutes
//! defaults for everything the caller left out.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{PulseError, Result};
use crate::protocol::kind::MessageKind;

/// Default sender stamped on outbound messages.
pub const CLIENT_SENDER: &str = "client";

/// Unit exchanged over the realtime transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Semantic category (field name is `type` in JSON).
    #[serde(rename = "type")]
    pub kind: MessageKind,
    /// Human-readable or raw payload.
    #[serde(default)]
    pub content: String,
    /// Structured payload, opaque to the router.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// ISO-8601 creation time, stamped by the sender.
    #[serde(default = "iso_now")]
    pub timestamp: String,
    /// Origin tag.
    #[serde(default = "default_sender")]
    pub sender: String,
    /// Point-to-point target (topic channel).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver: Option<String>,
    /// Extension attributes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Map<String, Value>>,
    /// Topic the envelope arrived on (topic channel only, never sent).
    #[serde(default, skip_serializing)]
    pub topic: Option<String>,
}

fn default_sender() -> String {
    CLIENT_SENDER.to_string()
}

/// Current UTC time, ISO-8601 with millisecond precision and `Z` suffix.
pub fn iso_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Convert epoch milliseconds into the envelope timestamp format.
pub fn iso_from_millis(millis: i64) -> Option<String> {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .map(|t| t.to_rfc3339_opts(SecondsFormat::Millis, true))
}

impl Envelope {
    /// Parse one inbound text frame.
    pub fn from_json(s: &str) -> Result<Self> {
        serde_json::from_str(s)
            .map_err(|e| PulseError::Parse(format!("invalid envelope json: {e}")))
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| PulseError::Parse(format!("envelope encode failed: {e}")))
    }
}

/// Partial outbound message; unset fields get defaults on `into_envelope`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutboundMessage {
    pub kind: Option<MessageKind>,
    pub content: Option<String>,
    pub data: Option<Value>,
    pub timestamp: Option<String>,
    pub sender: Option<String>,
    pub receiver: Option<String>,
    pub attributes: Option<Map<String, Value>>,
}

impl OutboundMessage {
    pub fn new(kind: impl Into<MessageKind>) -> Self {
        Self {
            kind: Some(kind.into()),
            ..Self::default()
        }
    }

    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn sender(mut self, sender: impl Into<String>) -> Self {
        self.sender = Some(sender.into());
        self
    }

    pub fn receiver(mut self, receiver: impl Into<String>) -> Self {
        self.receiver = Some(receiver.into());
        self
    }

    pub fn timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = Some(timestamp.into());
        self
    }

    pub fn attribute(mut self, key: impl Into<String>, value: Value) -> Self {
        self.attributes
            .get_or_insert_with(Map::new)
            .insert(key.into(), value);
        self
    }

    /// Heartbeat frame sent by the client on the simple channel.
    pub fn heartbeat() -> Self {
        Self::new(MessageKind::Heartbeat).content("ping")
    }

    pub fn ping() -> Self {
        Self::new(MessageKind::Ping).content("ping")
    }

    /// Fill in defaults: `custom` type, empty content, now, `client` sender.
    pub fn into_envelope(self) -> Envelope {
        Envelope {
            kind: self.kind.unwrap_or(MessageKind::Custom),
            content: self.content.unwrap_or_default(),
            data: self.data,
            timestamp: self.timestamp.unwrap_or_else(iso_now),
            sender: self.sender.unwrap_or_else(default_sender),
            receiver: self.receiver,
            attributes: self.attributes,
            topic: None,
        }
    }
}

impl From<Envelope> for OutboundMessage {
    fn from(env: Envelope) -> Self {
        Self {
            kind: Some(env.kind),
            content: Some(env.content),
            data: env.data,
            timestamp: Some(env.timestamp),
            sender: Some(env.sender),
            receiver: env.receiver,
            attributes: env.attributes,
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn defaults_fill_type_timestamp_sender() {
        let env = OutboundMessage::default().content("hi").into_envelope();
        assert_eq!(env.kind, MessageKind::Custom);
        assert_eq!(env.sender, "client");
        assert!(env.timestamp.ends_with('Z'));
        assert!(chrono::DateTime::parse_from_rfc3339(&env.timestamp).is_ok());
    }

    #[test]
    fn caller_fields_are_kept() {
        let env = OutboundMessage::new("ALERT_ACK")
            .sender("console")
            .timestamp("2024-01-01T00:00:00.000Z")
            .into_envelope();
        assert_eq!(env.kind.as_str(), "ALERT_ACK");
        assert_eq!(env.sender, "console");
        assert_eq!(env.timestamp, "2024-01-01T00:00:00.000Z");
    }

    #[test]
    fn topic_is_never_serialized() {
        let mut env = OutboundMessage::new(MessageKind::Log).into_envelope();
        env.topic = Some("/topic/logs".into());
        let s = env.to_json().unwrap();
        assert!(!s.contains("topic"));
    }

    #[test]
    fn millis_convert_to_iso() {
        assert_eq!(
            iso_from_millis(0).as_deref(),
            Some("1970-01-01T00:00:00.000Z")
        );
    }
}
