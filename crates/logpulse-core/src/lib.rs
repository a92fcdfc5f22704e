//! logpulse core: transport-agnostic message primitives, STOMP framing and
//! error types.
//!
//! This crate defines the wire-level contracts shared by the realtime client
//! and its tooling: the JSON message envelope, the closed set of known
//! message kinds, the STOMP 1.2 frame codec and the normalization of topic
//! payloads into envelopes. It carries no transport or runtime dependencies.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here. Malformed frames
//! surface as `PulseError` so a hostile or buggy server cannot crash the host.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod protocol;

/// Shared result type.
pub use error::{ErrorCode, PulseError, Result};
