//! Notification capability supplied by the host.

use std::fmt;

/// Severity of a user-visible notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyLevel {
    Success,
    Info,
    Warning,
    Error,
}

impl NotifyLevel {
    /// Parse the `level` field of a `SYSTEM_NOTIFICATION` message.
    /// Anything unrecognized is `Info`.
    pub fn from_feed(s: &str) -> Self {
        match s {
            "success" => NotifyLevel::Success,
            "warning" => NotifyLevel::Warning,
            "error" => NotifyLevel::Error,
            _ => NotifyLevel::Info,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NotifyLevel::Success => "success",
            NotifyLevel::Info => "info",
            NotifyLevel::Warning => "warning",
            NotifyLevel::Error => "error",
        }
    }
}

impl fmt::Display for NotifyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `notify(level, text)` as provided by the host UI.
pub trait Notifier: Send + Sync {
    fn notify(&self, level: NotifyLevel, text: &str);
}

/// Default notifier: log lines under the `logpulse::notify` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, level: NotifyLevel, text: &str) {
        match level {
            NotifyLevel::Success | NotifyLevel::Info => {
                tracing::info!(target: "logpulse::notify", level = %level, "{text}")
            }
            NotifyLevel::Warning => tracing::warn!(target: "logpulse::notify", "{text}"),
            NotifyLevel::Error => tracing::error!(target: "logpulse::notify", "{text}"),
        }
    }
}
