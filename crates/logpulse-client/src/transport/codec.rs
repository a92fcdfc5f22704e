//! Decode-once codec for both wire modes.
//!
//! - Plain: each text frame is one JSON envelope
//! - STOMP: each text frame holds zero or more STOMP frames; EOL-only frames
//!   are heart-beats
//!
//! Everything above the transport works on `Inbound`, never on raw text.

use logpulse_core::{
    error::{PulseError, Result},
    protocol::{
        stomp::{self, Command, StompFrame},
        Envelope,
    },
};

#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// Plain-wire envelope.
    Envelope(Envelope),
    /// STOMP session accepted; carries the server `heart-beat` header.
    Connected { heartbeat: Option<String> },
    /// STOMP topic delivery, body not yet normalized.
    Message {
        subscription: Option<String>,
        destination: Option<String>,
        body: String,
    },
    /// STOMP `ERROR` frame.
    ServerError { message: String },
    Receipt,
    /// STOMP EOL heart-beat.
    Heartbeat,
}

pub fn decode_plain(text: &str) -> Result<Inbound> {
    Envelope::from_json(text).map(Inbound::Envelope)
}

/// One entry per STOMP frame; a bad frame does not spoil the others.
pub fn decode_stomp(text: &str) -> Vec<Result<Inbound>> {
    let frames = stomp::decode_each(text);
    if frames.is_empty() {
        return vec![Ok(Inbound::Heartbeat)];
    }
    frames.into_iter().map(|f| f.and_then(classify)).collect()
}

fn classify(frame: StompFrame) -> Result<Inbound> {
    match frame.command {
        Command::Connected => Ok(Inbound::Connected {
            heartbeat: frame.get("heart-beat").map(str::to_string),
        }),
        Command::Message => Ok(Inbound::Message {
            subscription: frame.get("subscription").map(str::to_string),
            destination: frame.get("destination").map(str::to_string),
            body: frame.body,
        }),
        Command::Error => {
            let message = match frame.get("message") {
                Some(m) => m.to_string(),
                None if !frame.body.is_empty() => frame.body.clone(),
                None => "server error".to_string(),
            };
            Ok(Inbound::ServerError { message })
        }
        Command::Receipt => Ok(Inbound::Receipt),
        other => Err(PulseError::Protocol(format!(
            "unexpected client frame from server: {}",
            other.as_str()
        ))),
    }
}

pub fn encode_plain(env: &Envelope) -> Result<String> {
    env.to_json()
}

pub fn encode_stomp_send(destination: &str, env: &Envelope) -> Result<String> {
    Ok(StompFrame::send(destination, env.to_json()?).encode())
}
