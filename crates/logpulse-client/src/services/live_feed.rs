use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use serde_json::Value;

use logpulse_core::error::{PulseError, Result};
use logpulse_core::protocol::feed::{SecurityAlert, SecurityLog, Statistics, ThreatLevel};
use logpulse_core::protocol::{Envelope, MessageKind};

use crate::dispatch::handler;
use crate::hook::RealtimeHook;
use crate::obs::{Notifier, NotifyLevel};

/// Previous log entries kept when new ones arrive.
pub const LOG_HISTORY: usize = 100;
/// Previous alerts kept when a new one arrives.
pub const ALERT_HISTORY: usize = 50;

/// State a dashboard page hydrates from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedSnapshot {
    /// Newest first.
    pub logs: Vec<SecurityLog>,
    /// Newest first.
    pub alerts: Vec<SecurityAlert>,
    pub statistics: Option<Statistics>,
}

/// Live security feed fed by topic messages.
///
/// Handlers are registered through the given hook, so dropping the hook
/// detaches the feed. The snapshot stays readable afterwards.
#[derive(Clone)]
pub struct LiveFeed {
    state: Arc<Mutex<FeedSnapshot>>,
}

impl LiveFeed {
    pub fn attach(hook: &RealtimeHook, notifier: Arc<dyn Notifier>) -> Self {
        let state = Arc::new(Mutex::new(FeedSnapshot::default()));

        let st = Arc::clone(&state);
        hook.on_message(
            MessageKind::NewLogs,
            handler(move |env| {
                let logs = parse_logs(body(env).get("logs"))?;
                prepend(&mut lock(&st).logs, logs, LOG_HISTORY);
                Ok(())
            }),
        );

        let st = Arc::clone(&state);
        hook.on_message(
            MessageKind::SingleLog,
            handler(move |env| {
                let Some(raw) = body(env).get("log") else {
                    return Ok(());
                };
                let log = parse_log(raw)?;
                prepend(&mut lock(&st).logs, vec![log], LOG_HISTORY);
                Ok(())
            }),
        );

        let st = Arc::clone(&state);
        let n = Arc::clone(&notifier);
        hook.on_message(
            MessageKind::SecurityAlert,
            handler(move |env| {
                let alert = SecurityAlert::from_message(body(env), Utc::now().timestamp_millis(), &env.timestamp);
                let level = match alert.alert_level {
                    ThreatLevel::Critical | ThreatLevel::High => NotifyLevel::Error,
                    ThreatLevel::Medium => NotifyLevel::Warning,
                    ThreatLevel::Low => NotifyLevel::Info,
                };
                n.notify(level, &format!("security alert: {}", alert.description));
                prepend(&mut lock(&st).alerts, vec![alert], ALERT_HISTORY);
                Ok(())
            }),
        );

        let st = Arc::clone(&state);
        hook.on_message(
            MessageKind::Statistics,
            handler(move |env| {
                let Some(raw) = body(env).get("data") else {
                    return Ok(());
                };
                let stats: Statistics = serde_json::from_value(raw.clone())
                    .map_err(|e| PulseError::Handler(format!("invalid statistics: {e}")))?;
                lock(&st).statistics = Some(stats);
                Ok(())
            }),
        );

        let n = Arc::clone(&notifier);
        hook.on_message(
            MessageKind::SystemNotification,
            handler(move |env| {
                let b = body(env);
                let level = b.get("level").and_then(Value::as_str).unwrap_or("info");
                let text = b
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("system notification");
                n.notify(NotifyLevel::from_feed(level), text);
                Ok(())
            }),
        );

        let n = Arc::clone(&notifier);
        hook.on_message(
            MessageKind::SystemInfo,
            handler(move |env| {
                n.notify(NotifyLevel::Info, or_default(&env.content, "system info"));
                Ok(())
            }),
        );

        let n = Arc::clone(&notifier);
        hook.on_message(
            MessageKind::SystemError,
            handler(move |env| {
                n.notify(NotifyLevel::Error, or_default(&env.content, "system error"));
                Ok(())
            }),
        );

        hook.on_message(
            MessageKind::TestMessage,
            handler(move |env| {
                tracing::debug!(content = %env.content, "test message received");
                notifier.notify(NotifyLevel::Info, &format!("test message: {}", env.content));
                Ok(())
            }),
        );

        Self { state }
    }

    pub fn snapshot(&self) -> FeedSnapshot {
        lock(&self.state).clone()
    }

    pub fn logs(&self) -> Vec<SecurityLog> {
        lock(&self.state).logs.clone()
    }

    pub fn alerts(&self) -> Vec<SecurityAlert> {
        lock(&self.state).alerts.clone()
    }

    pub fn statistics(&self) -> Option<Statistics> {
        lock(&self.state).statistics.clone()
    }

    /// Merge logs fetched out of band (newest first). Entries whose id is
    /// already buffered are skipped; the buffer keeps `LOG_HISTORY + 1` logs.
    pub fn merge_history(&self, history: Vec<SecurityLog>) {
        let mut st = lock(&self.state);
        let mut seen: HashSet<i64> = st.logs.iter().map(|l| l.id).collect();
        for log in history {
            if seen.insert(log.id) {
                st.logs.push(log);
            }
        }
        st.logs.truncate(LOG_HISTORY + 1);
    }
}

fn lock(m: &Mutex<FeedSnapshot>) -> MutexGuard<'_, FeedSnapshot> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Raw topic body; `null` when the envelope carries none.
fn body(env: &Envelope) -> &Value {
    static EMPTY: Value = Value::Null;
    env.data.as_ref().unwrap_or(&EMPTY)
}

fn or_default<'a>(s: &'a str, fallback: &'a str) -> &'a str {
    if s.is_empty() {
        fallback
    } else {
        s
    }
}

fn parse_log(raw: &Value) -> Result<SecurityLog> {
    serde_json::from_value(raw.clone()).map_err(|e| PulseError::Handler(format!("invalid log entry: {e}")))
}

fn parse_logs(raw: Option<&Value>) -> Result<Vec<SecurityLog>> {
    match raw {
        Some(Value::Array(items)) => items.iter().map(parse_log).collect(),
        _ => Ok(Vec::new()),
    }
}

/// `fresh` first, then at most `keep` of the previous entries.
fn prepend<T>(buf: &mut Vec<T>, mut fresh: Vec<T>, keep: usize) {
    if fresh.is_empty() {
        return;
    }
    buf.truncate(keep);
    fresh.append(buf);
    *buf = fresh;
}
