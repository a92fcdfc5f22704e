//! Typed payloads carried by the security feed topics.
//!
//! Field names follow the dashboard's camelCase JSON. Every struct is
//! lenient (`#[serde(default)]`) because the feed server omits fields freely.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Severity shared by logs and alerts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ThreatLevel {
    #[default]
    Low,
    Medium,
    High,
    Critical,
}

impl ThreatLevel {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "LOW" => Some(ThreatLevel::Low),
            "MEDIUM" => Some(ThreatLevel::Medium),
            "HIGH" => Some(ThreatLevel::High),
            "CRITICAL" => Some(ThreatLevel::Critical),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ThreatLevel::Low => "LOW",
            ThreatLevel::Medium => "MEDIUM",
            ThreatLevel::High => "HIGH",
            ThreatLevel::Critical => "CRITICAL",
        }
    }
}

/// One Windows security log record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SecurityLog {
    pub id: i64,
    pub event_id: i64,
    pub event_time: String,
    pub computer_name: String,
    pub source_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_sid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logon_type: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_code: Option<i64>,
    pub raw_message: String,
    pub threat_level: ThreatLevel,
    pub created_time: String,
}

/// Alert raised by the analysis pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SecurityAlert {
    pub id: String,
    pub alert_level: ThreatLevel,
    pub alert_type: String,
    pub description: String,
    pub handled: bool,
    pub created_time: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub computer_name: Option<String>,
}

impl SecurityAlert {
    /// Build an alert from a `SECURITY_ALERT` message body.
    ///
    /// The message carries `level` (not `alertLevel`); a missing `id` becomes
    /// `alert_<now_millis>` and a missing `timestamp` becomes `fallback_time`.
    pub fn from_message(msg: &Value, now_millis: i64, fallback_time: &str) -> Self {
        let text = |key: &str| msg.get(key).and_then(Value::as_str).map(str::to_string);

        let id = match msg.get("id") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => format!("alert_{now_millis}"),
        };

        Self {
            id,
            alert_level: msg
                .get("level")
                .and_then(Value::as_str)
                .and_then(ThreatLevel::parse)
                .unwrap_or_default(),
            alert_type: text("alertType").unwrap_or_default(),
            description: text("description").unwrap_or_default(),
            handled: false,
            created_time: text("timestamp").unwrap_or_else(|| fallback_time.to_string()),
            event_id: msg.get("eventId").and_then(Value::as_i64),
            source: text("source"),
            computer_name: text("computerName"),
        }
    }
}

/// Per-level counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "UPPERCASE")]
pub struct ThreatLevelCounts {
    pub low: u64,
    pub medium: u64,
    pub high: u64,
    pub critical: u64,
}

/// Dashboard statistics snapshot (`STATISTICS.data`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Statistics {
    pub event_counts: Vec<(i64, u64)>,
    pub daily_counts: Vec<(String, u64)>,
    pub brute_force_attempts: Vec<(String, u64)>,
    pub total_alerts: u64,
    pub unhandled_alerts: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threat_levels: Option<ThreatLevelCounts>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_logs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security_events: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recent_alerts: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brute_force_alerts: Option<u64>,
}
