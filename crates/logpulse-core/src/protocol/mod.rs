//! Protocol modules.
//!
//! - `kind`: closed set of message type tags with an `Unknown` fallback.
//! - `envelope`: the JSON message envelope and outbound defaulting.
//! - `stomp`: STOMP 1.2 text frame codec (topic channel).
//! - `topic`: normalization of topic bodies into envelopes.
//! - `feed`: typed payloads carried by the security feed topics.
//!
//! All parsers are panic-free: malformed input is reported as `PulseError`.

pub mod envelope;
pub mod feed;
pub mod kind;
pub mod stomp;
pub mod topic;

pub use envelope::{iso_now, Envelope, OutboundMessage};
pub use kind::MessageKind;
