//! WebSocket connector (tokio-tungstenite).
//!
//! Each open session gets a bridge task that owns the split socket:
//! - outbound channel -> sink (text frames, graceful close)
//! - stream -> event channel (text/binary frames as text, close, errors)
//!
//! Ping/Pong control frames are answered by tungstenite itself and never
//! surface as events.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};

use logpulse_core::error::{PulseError, Result};

use super::{Connector, Outbound, TransportEvent, TransportLink, OUTBOUND_CAPACITY};

#[derive(Debug, Clone)]
pub struct WsConnector {
    connect_timeout: Duration,
}

impl WsConnector {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

#[async_trait]
impl Connector for WsConnector {
    async fn open(&self, url: &str) -> Result<TransportLink> {
        let (socket, _resp) = tokio::time::timeout(self.connect_timeout, connect_async(url))
            .await
            .map_err(|_| PulseError::Transport(format!("connect to {url} timed out")))?
            .map_err(|e| PulseError::Transport(format!("connect to {url} failed: {e}")))?;

        tracing::debug!(url = %url, "websocket opened");

        let (out_tx, mut out_rx) = mpsc::channel::<Outbound>(OUTBOUND_CAPACITY);
        let (ev_tx, ev_rx) = mpsc::channel::<TransportEvent>(OUTBOUND_CAPACITY);
        let (mut ws_tx, mut ws_rx) = socket.split();

        tokio::spawn(async move {
            let mut writing = true;
            loop {
                tokio::select! {
                    // outbound writer
                    maybe_out = out_rx.recv(), if writing => {
                        match maybe_out {
                            Some(Outbound::Text(s)) => {
                                if let Err(e) = ws_tx.send(Message::text(s)).await {
                                    let _ = ev_tx.send(TransportEvent::Error(format!("send failed: {e}"))).await;
                                    break;
                                }
                            }
                            Some(Outbound::Close) | None => {
                                // Keep reading until the peer acknowledges the close.
                                if let Err(e) = ws_tx.close().await {
                                    tracing::debug!(error = %e, "websocket close failed");
                                }
                                writing = false;
                            }
                        }
                    }

                    // inbound reader
                    incoming = ws_rx.next() => {
                        let event = match incoming {
                            Some(Ok(Message::Text(t))) => TransportEvent::Frame(t.as_str().to_string()),
                            Some(Ok(Message::Binary(b))) => match String::from_utf8(b.to_vec()) {
                                Ok(s) => TransportEvent::Frame(s),
                                Err(_) => {
                                    tracing::warn!(bytes = b.len(), "non-utf8 binary frame dropped");
                                    continue;
                                }
                            },
                            Some(Ok(Message::Close(frame))) => {
                                let (code, reason) = match frame {
                                    Some(f) => (Some(u16::from(f.code)), f.reason.to_string()),
                                    None => (None, String::new()),
                                };
                                let _ = ev_tx.send(TransportEvent::Closed { code, reason }).await;
                                break;
                            }
                            Some(Ok(_)) => continue,
                            Some(Err(e)) => {
                                let _ = ev_tx.send(TransportEvent::Error(e.to_string())).await;
                                break;
                            }
                            None => {
                                let _ = ev_tx
                                    .send(TransportEvent::Closed { code: None, reason: "stream ended".into() })
                                    .await;
                                break;
                            }
                        };
                        if ev_tx.send(event).await.is_err() {
                            // Session owner is gone.
                            break;
                        }
                    }
                }
            }
        });

        Ok(TransportLink {
            outbound: out_tx,
            events: ev_rx,
        })
    }
}
