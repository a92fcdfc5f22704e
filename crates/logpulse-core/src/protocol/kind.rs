//! Message type tags.
//!
//! Tags are case-sensitive and round-trip exactly: a tag that is not one of
//! the known spellings below becomes `Unknown(raw)` and serializes back to
//! `raw`. The simple channel uses lowercase tags, the topic channel uses
//! SCREAMING_CASE tags.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Semantic category of an envelope (`type` on the wire).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MessageKind {
    // simple channel
    Heartbeat,
    Ping,
    Pong,
    Log,
    Alert,
    System,
    Custom,
    // topic channel
    NewLogs,
    SingleLog,
    SecurityAlert,
    Statistics,
    SystemNotification,
    SystemInfo,
    SystemError,
    TestMessage,
    /// Any tag not listed above, kept verbatim.
    Unknown(String),
}

impl MessageKind {
    pub fn as_str(&self) -> &str {
        match self {
            MessageKind::Heartbeat => "heartbeat",
            MessageKind::Ping => "ping",
            MessageKind::Pong => "pong",
            MessageKind::Log => "log",
            MessageKind::Alert => "alert",
            MessageKind::System => "system",
            MessageKind::Custom => "custom",
            MessageKind::NewLogs => "NEW_LOGS",
            MessageKind::SingleLog => "SINGLE_LOG",
            MessageKind::SecurityAlert => "SECURITY_ALERT",
            MessageKind::Statistics => "STATISTICS",
            MessageKind::SystemNotification => "SYSTEM_NOTIFICATION",
            MessageKind::SystemInfo => "SYSTEM_INFO",
            MessageKind::SystemError => "SYSTEM_ERROR",
            MessageKind::TestMessage => "TEST_MESSAGE",
            MessageKind::Unknown(raw) => raw,
        }
    }

    /// Liveness frames of the simple channel (`pong`, `heartbeat`).
    pub fn is_liveness(&self) -> bool {
        matches!(self, MessageKind::Pong | MessageKind::Heartbeat)
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, MessageKind::Unknown(_))
    }
}

impl From<&str> for MessageKind {
    fn from(s: &str) -> Self {
        match s {
            "heartbeat" => MessageKind::Heartbeat,
            "ping" => MessageKind::Ping,
            "pong" => MessageKind::Pong,
            "log" => MessageKind::Log,
            "alert" => MessageKind::Alert,
            "system" => MessageKind::System,
            "custom" => MessageKind::Custom,
            "NEW_LOGS" => MessageKind::NewLogs,
            "SINGLE_LOG" => MessageKind::SingleLog,
            "SECURITY_ALERT" => MessageKind::SecurityAlert,
            "STATISTICS" => MessageKind::Statistics,
            "SYSTEM_NOTIFICATION" => MessageKind::SystemNotification,
            "SYSTEM_INFO" => MessageKind::SystemInfo,
            "SYSTEM_ERROR" => MessageKind::SystemError,
            "TEST_MESSAGE" => MessageKind::TestMessage,
            other => MessageKind::Unknown(other.to_string()),
        }
    }
}

impl From<String> for MessageKind {
    fn from(s: String) -> Self {
        match MessageKind::from(s.as_str()) {
            MessageKind::Unknown(_) => MessageKind::Unknown(s),
            known => known,
        }
    }
}

impl From<MessageKind> for String {
    fn from(kind: MessageKind) -> Self {
        match kind {
            MessageKind::Unknown(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
