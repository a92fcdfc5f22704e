//! Transport layer (WebSocket).
//!
//! A `Connector` opens one session and hands back a `TransportLink`: a pair of
//! channels to and from a bridge task that owns the socket. The connection
//! manager only ever talks to channels, which keeps it testable with an
//! in-memory connector.

pub mod codec;
pub mod ws;

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use logpulse_core::error::Result;

pub use ws::WsConnector;

/// Outbound channel depth per session.
pub const OUTBOUND_CAPACITY: usize = 256;

/// Command for the socket writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Text(String),
    /// Graceful close; the bridge stops writing afterwards.
    Close,
}

/// What the socket reader observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Frame(String),
    Closed { code: Option<u16>, reason: String },
    Error(String),
}

/// Channel ends of one open transport session.
#[derive(Debug)]
pub struct TransportLink {
    pub outbound: mpsc::Sender<Outbound>,
    pub events: mpsc::Receiver<TransportEvent>,
}

/// Opens transport sessions. Errors are `PulseError::Transport`.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn open(&self, url: &str) -> Result<TransportLink>;
}

/// One-shot reachability check: open, then close right away.
///
/// Returns `false` on failure or when opening takes longer than `timeout`.
pub async fn probe(connector: &dyn Connector, url: &str, timeout: Duration) -> bool {
    match tokio::time::timeout(timeout, connector.open(url)).await {
        Ok(Ok(link)) => {
            let _ = link.outbound.try_send(Outbound::Close);
            tracing::info!(url = %url, "probe succeeded");
            true
        }
        Ok(Err(e)) => {
            tracing::warn!(url = %url, error = %e, "probe failed");
            false
        }
        Err(_) => {
            tracing::warn!(url = %url, timeout_ms = timeout.as_millis() as u64, "probe timed out");
            false
        }
    }
}
