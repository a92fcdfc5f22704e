//! Shared error type across logpulse crates.

use thiserror::Error;

/// Stable error codes (used in logs, notifications and tests).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Transport could not be constructed or opened.
    Transport,
    /// Protocol-level failure (handshake, server ERROR frame).
    Protocol,
    /// Malformed inbound or outbound payload.
    Parse,
    /// Operation requires an open connection.
    NotConnected,
    /// Invalid configuration.
    Config,
    /// Unsupported config/protocol version.
    UnsupportedVersion,
    /// A message handler failed.
    Handler,
    /// Internal error.
    Internal,
}

impl ErrorCode {
    /// String representation used in logs and notifications.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::Transport => "TRANSPORT",
            ErrorCode::Protocol => "PROTOCOL",
            ErrorCode::Parse => "PARSE",
            ErrorCode::NotConnected => "NOT_CONNECTED",
            ErrorCode::Config => "CONFIG",
            ErrorCode::UnsupportedVersion => "UNSUPPORTED_VERSION",
            ErrorCode::Handler => "HANDLER",
            ErrorCode::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, PulseError>;

/// Unified error type used by core and client.
#[derive(Debug, Clone, Error)]
pub enum PulseError {
    #[error("transport: {0}")]
    Transport(String),
    #[error("protocol: {0}")]
    Protocol(String),
    #[error("parse: {0}")]
    Parse(String),
    #[error("not connected")]
    NotConnected,
    #[error("config: {0}")]
    Config(String),
    #[error("unsupported version")]
    UnsupportedVersion,
    #[error("handler: {0}")]
    Handler(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl PulseError {
    /// Map the error to its stable code.
    pub fn code(&self) -> ErrorCode {
        match self {
            PulseError::Transport(_) => ErrorCode::Transport,
            PulseError::Protocol(_) => ErrorCode::Protocol,
            PulseError::Parse(_) => ErrorCode::Parse,
            PulseError::NotConnected => ErrorCode::NotConnected,
            PulseError::Config(_) => ErrorCode::Config,
            PulseError::UnsupportedVersion => ErrorCode::UnsupportedVersion,
            PulseError::Handler(_) => ErrorCode::Handler,
            PulseError::Internal(_) => ErrorCode::Internal,
        }
    }
}
