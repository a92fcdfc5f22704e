//! Topic body normalization.
//!
//! Topic frames carry flat JSON objects (`{"type":"NEW_LOGS","logs":[..]}`)
//! rather than envelopes. Each body is normalized on its own so one bad frame
//! never affects another:
//! - body must be a JSON object with a string `type`
//! - `content`: `content`, else `message`, else `description`, else empty
//! - `data`: the whole object
//! - `timestamp`: string as-is, epoch millis converted, else now
//! - `sender`: `sender` or `"server"`; `receiver` copied when present

use serde_json::Value;

use crate::error::{PulseError, Result};
use crate::protocol::envelope::{iso_from_millis, iso_now, Envelope};
use crate::protocol::kind::MessageKind;

/// Sender tag for topic frames that do not name one.
pub const SERVER_SENDER: &str = "server";

/// Default topic set of the security feed.
pub const DEFAULT_TOPICS: [&str; 5] = [
    "/topic/logs",
    "/topic/alerts",
    "/topic/stats",
    "/topic/notifications",
    "/topic/broadcast",
];

/// Default publish destination.
pub const DEFAULT_PUBLISH_DESTINATION: &str = "/app/message";

pub fn normalize_topic_body(topic: &str, body: &str) -> Result<Envelope> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| PulseError::Parse(format!("invalid topic json on {topic}: {e}")))?;

    let obj = value.as_object().ok_or_else(|| {
        PulseError::Parse(format!("topic {topic} body is not a JSON object"))
    })?;

    let kind = obj
        .get("type")
        .and_then(Value::as_str)
        .map(MessageKind::from)
        .ok_or_else(|| PulseError::Parse(format!("topic {topic} body has no string type")))?;

    let text = |key: &str| obj.get(key).and_then(Value::as_str).map(str::to_string);

    let content = text("content")
        .or_else(|| text("message"))
        .or_else(|| text("description"))
        .unwrap_or_default();

    let timestamp = match obj.get("timestamp") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.as_i64().and_then(iso_from_millis).unwrap_or_else(iso_now),
        _ => iso_now(),
    };

    Ok(Envelope {
        kind,
        content,
        timestamp,
        sender: text("sender").unwrap_or_else(|| SERVER_SENDER.to_string()),
        receiver: text("receiver"),
        attributes: None,
        topic: Some(topic.to_string()),
        data: Some(value),
    })
}
