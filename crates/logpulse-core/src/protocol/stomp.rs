//! STOMP 1.2 text frame codec (panic-free).
//!
//! Frame layout: `COMMAND EOL *(header EOL) EOL body NUL`. A WebSocket
//! message may carry heart-beat EOLs, one frame, or several frames back to
//! back. `decode_frames` returns every complete frame and treats a message
//! consisting only of EOLs as a heart-beat (empty result); `decode_each`
//! does the same but keeps going past a malformed frame.
//!
//! Parsing rules:
//! - Never index strings by byte offset without a `find` result.
//! - Header values are unescaped (`\\`, `\n`, `\r`, `\c`) except on
//!   CONNECT/CONNECTED frames, as the protocol requires.
//! - Repeated headers: the first occurrence wins.

use std::fmt;

use crate::error::{PulseError, Result};

/// Supported protocol version sent in `accept-version`.
pub const STOMP_VERSION: &str = "1.2";

/// A bare heart-beat (single EOL).
pub const HEARTBEAT_FRAME: &str = "\n";

/// STOMP commands (client and server side).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Connect,
    Stomp,
    Connected,
    Send,
    Subscribe,
    Unsubscribe,
    Ack,
    Nack,
    Begin,
    Commit,
    Abort,
    Disconnect,
    Message,
    Receipt,
    Error,
}

impl Command {
    pub fn as_str(self) -> &'static str {
        match self {
            Command::Connect => "CONNECT",
            Command::Stomp => "STOMP",
            Command::Connected => "CONNECTED",
            Command::Send => "SEND",
            Command::Subscribe => "SUBSCRIBE",
            Command::Unsubscribe => "UNSUBSCRIBE",
            Command::Ack => "ACK",
            Command::Nack => "NACK",
            Command::Begin => "BEGIN",
            Command::Commit => "COMMIT",
            Command::Abort => "ABORT",
            Command::Disconnect => "DISCONNECT",
            Command::Message => "MESSAGE",
            Command::Receipt => "RECEIPT",
            Command::Error => "ERROR",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        Ok(match s {
            "CONNECT" => Command::Connect,
            "STOMP" => Command::Stomp,
            "CONNECTED" => Command::Connected,
            "SEND" => Command::Send,
            "SUBSCRIBE" => Command::Subscribe,
            "UNSUBSCRIBE" => Command::Unsubscribe,
            "ACK" => Command::Ack,
            "NACK" => Command::Nack,
            "BEGIN" => Command::Begin,
            "COMMIT" => Command::Commit,
            "ABORT" => Command::Abort,
            "DISCONNECT" => Command::Disconnect,
            "MESSAGE" => Command::Message,
            "RECEIPT" => Command::Receipt,
            "ERROR" => Command::Error,
            other => {
                return Err(PulseError::Protocol(format!("unknown stomp command: {other}")))
            }
        })
    }

    /// CONNECT/CONNECTED headers are sent without escaping.
    fn escapes_headers(self) -> bool {
        !matches!(self, Command::Connect | Command::Stomp | Command::Connected)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One STOMP frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StompFrame {
    pub command: Command,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl StompFrame {
    pub fn new(command: Command) -> Self {
        Self {
            command,
            headers: Vec::new(),
            body: String::new(),
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// First value of a header.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// CONNECT frame with heart-beat offer `out,in` (milliseconds).
    pub fn connect(host: &str, heartbeat_out_ms: u64, heartbeat_in_ms: u64) -> Self {
        Self::new(Command::Connect)
            .header("accept-version", STOMP_VERSION)
            .header("host", host)
            .header("heart-beat", format!("{heartbeat_out_ms},{heartbeat_in_ms}"))
    }

    pub fn subscribe(id: &str, destination: &str) -> Self {
        Self::new(Command::Subscribe)
            .header("id", id)
            .header("destination", destination)
            .header("ack", "auto")
    }

    pub fn unsubscribe(id: &str) -> Self {
        Self::new(Command::Unsubscribe).header("id", id)
    }

    pub fn send(destination: &str, json_body: impl Into<String>) -> Self {
        let body = json_body.into();
        Self::new(Command::Send)
            .header("destination", destination)
            .header("content-type", "application/json")
            .header("content-length", body.len().to_string())
            .body(body)
    }

    pub fn disconnect() -> Self {
        Self::new(Command::Disconnect)
    }

    /// Serialize to wire text (terminated by NUL).
    pub fn encode(&self) -> String {
        let escape = self.command.escapes_headers();
        let mut out = String::with_capacity(64 + self.body.len());
        out.push_str(self.command.as_str());
        out.push('\n');
        for (k, v) in &self.headers {
            if escape {
                out.push_str(&escape_header(k));
                out.push(':');
                out.push_str(&escape_header(v));
            } else {
                out.push_str(k);
                out.push(':');
                out.push_str(v);
            }
            out.push('\n');
        }
        out.push('\n');
        out.push_str(&self.body);
        out.push('\0');
        out
    }
}

fn escape_header(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            ':' => out.push_str("\\c"),
            other => out.push(other),
        }
    }
    out
}

fn unescape_header(s: &str) -> Result<String> {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('c') => out.push(':'),
            other => {
                return Err(PulseError::Protocol(format!(
                    "invalid header escape: \\{}",
                    other.map(String::from).unwrap_or_default()
                )))
            }
        }
    }
    Ok(out)
}

/// Split off one line (EOL is `\n` or `\r\n`).
fn take_line(s: &str) -> Option<(&str, &str)> {
    let idx = s.find('\n')?;
    let line = &s[..idx];
    let line = line.strip_suffix('\r').unwrap_or(line);
    Some((line, &s[idx + 1..]))
}

/// Decode every frame contained in one transport message; the first
/// malformed frame fails the whole message.
pub fn decode_frames(input: &str) -> Result<Vec<StompFrame>> {
    decode_each(input).into_iter().collect()
}

/// Decode every frame contained in one transport message, one result per
/// frame.
///
/// A malformed frame becomes an `Err` entry and decoding resumes after the
/// next NUL. A malformed frame with no NUL after it ends the message.
pub fn decode_each(mut input: &str) -> Vec<Result<StompFrame>> {
    let mut out = Vec::new();
    loop {
        input = input.trim_start_matches(|c: char| c == '\n' || c == '\r');
        if input.is_empty() {
            return out;
        }
        match decode_one(input) {
            Ok((frame, rest)) => {
                out.push(Ok(frame));
                input = rest;
            }
            Err(e) => {
                out.push(Err(e));
                match input.find('\0') {
                    Some(nul) => input = &input[nul + 1..],
                    None => return out,
                }
            }
        }
    }
}

fn decode_one(input: &str) -> Result<(StompFrame, &str)> {
    let (cmd_line, mut rest) = take_line(input)
        .ok_or_else(|| PulseError::Protocol("stomp frame missing command line".into()))?;
    let command = Command::parse(cmd_line)?;
    let escaped = command.escapes_headers();

    let mut headers = Vec::new();
    loop {
        let (line, after) = take_line(rest)
            .ok_or_else(|| PulseError::Protocol("stomp frame truncated in headers".into()))?;
        rest = after;
        if line.is_empty() {
            break;
        }
        let (k, v) = line
            .split_once(':')
            .ok_or_else(|| PulseError::Protocol(format!("malformed stomp header: {line}")))?;
        if escaped {
            headers.push((unescape_header(k)?, unescape_header(v)?));
        } else {
            headers.push((k.to_string(), v.to_string()));
        }
    }

    let declared_len = headers
        .iter()
        .find(|(k, _)| k == "content-length")
        .map(|(_, v)| {
            v.trim()
                .parse::<usize>()
                .map_err(|_| PulseError::Protocol(format!("invalid content-length: {v}")))
        })
        .transpose()?;

    let (body, after) = match declared_len {
        Some(n) => {
            let body = rest
                .get(..n)
                .ok_or_else(|| PulseError::Protocol("stomp body shorter than content-length".into()))?;
            let after = rest
                .get(n..)
                .and_then(|r| r.strip_prefix('\0'))
                .ok_or_else(|| PulseError::Protocol("stomp frame missing NUL terminator".into()))?;
            (body, after)
        }
        None => {
            let nul = rest
                .find('\0')
                .ok_or_else(|| PulseError::Protocol("stomp frame missing NUL terminator".into()))?;
            (&rest[..nul], &rest[nul + 1..])
        }
    };

    Ok((
        StompFrame {
            command,
            headers,
            body: body.to_string(),
        },
        after,
    ))
}

/// Negotiated heart-beat periods in milliseconds: `(send_every, expect_every)`.
///
/// `client_out`/`client_in` are what the client offered in CONNECT; the
/// server answers `sx,sy` in CONNECTED. Zero means disabled.
pub fn negotiate_heartbeat(client_out: u64, client_in: u64, server_header: Option<&str>) -> (u64, u64) {
    let (sx, sy) = server_header
        .and_then(|h| h.split_once(','))
        .and_then(|(a, b)| Some((a.trim().parse::<u64>().ok()?, b.trim().parse::<u64>().ok()?)))
        .unwrap_or((0, 0));

    let send_every = if client_out == 0 || sy == 0 { 0 } else { client_out.max(sy) };
    let expect_every = if client_in == 0 || sx == 0 { 0 } else { client_in.max(sx) };
    (send_every, expect_every)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn header_escaping_round_trips() {
        let f = StompFrame::new(Command::Send).header("x-note", "a:b\nc\\d");
        let wire = f.encode();
        assert!(wire.contains("x-note:a\\cb\\nc\\\\d\n"));
        let back = decode_frames(&wire).unwrap();
        assert_eq!(back[0].get("x-note"), Some("a:b\nc\\d"));
    }

    #[test]
    fn connect_headers_are_not_escaped() {
        let wire = StompFrame::connect("localhost:8080", 10000, 10000).encode();
        assert!(wire.starts_with("CONNECT\naccept-version:1.2\nhost:localhost:8080\n"));
    }

    #[test]
    fn heartbeat_negotiation() {
        assert_eq!(negotiate_heartbeat(10000, 10000, Some("0,0")), (0, 0));
        assert_eq!(negotiate_heartbeat(10000, 10000, Some("5000,20000")), (20000, 10000));
        assert_eq!(negotiate_heartbeat(0, 10000, Some("5000,5000")), (0, 10000));
        assert_eq!(negotiate_heartbeat(10000, 10000, None), (0, 0));
    }

    #[test]
    fn two_frames_in_one_message() {
        let wire = format!(
            "{}\n{}",
            StompFrame::new(Command::Receipt).header("receipt-id", "1").encode(),
            StompFrame::new(Command::Receipt).header("receipt-id", "2").encode()
        );
        let frames = decode_frames(&wire).unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1].get("receipt-id"), Some("2"));
    }

    #[test]
    fn bad_frame_is_isolated_from_its_neighbours() {
        let wire = format!(
            "{}BOGUS\n\n\0\n{}",
            StompFrame::new(Command::Receipt).header("receipt-id", "1").encode(),
            StompFrame::new(Command::Receipt).header("receipt-id", "2").encode()
        );
        let each = decode_each(&wire);
        assert_eq!(each.len(), 3);
        assert_eq!(each[0].as_ref().unwrap().get("receipt-id"), Some("1"));
        assert_eq!(each[1].as_ref().unwrap_err().code().as_str(), "PROTOCOL");
        assert_eq!(each[2].as_ref().unwrap().get("receipt-id"), Some("2"));

        assert!(decode_frames(&wire).is_err());
    }

    #[test]
    fn unterminated_bad_frame_ends_the_message() {
        let wire = format!(
            "{}MESSAGE\ndestination:/x\n\n{{}}",
            StompFrame::new(Command::Receipt).header("receipt-id", "1").encode()
        );
        let each = decode_each(&wire);
        assert_eq!(each.len(), 2);
        assert!(each[0].is_ok());
        assert!(each[1].is_err());
    }
}
