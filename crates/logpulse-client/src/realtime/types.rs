use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use logpulse_core::error::PulseError;

/// Connection state, numbered like the browser `readyState`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ReadyState {
    Connecting = 0,
    Open = 1,
    Closing = 2,
    Closed = 3,
}

impl ReadyState {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ReadyState::Connecting => "connecting",
            ReadyState::Open => "open",
            ReadyState::Closing => "closing",
            ReadyState::Closed => "closed",
        }
    }
}

impl fmt::Display for ReadyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle transitions broadcast by the connection manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    Connecting { attempt: u32 },
    Open,
    Closed { code: Option<u16>, reason: String },
    ReconnectScheduled { attempt: u32, delay: Duration },
    RetryExhausted { attempts: u32 },
}

/// Called every time a session opens.
pub type OpenHandler = Arc<dyn Fn() + Send + Sync>;

/// Called on transport/protocol failures.
pub type ErrorHandler = Arc<dyn Fn(&PulseError) + Send + Sync>;
