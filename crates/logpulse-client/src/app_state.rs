//! Shared application state for the realtime client.
//!
//! Wires the connection manager (with its router), the notifier and the
//! transport connector. Constructed once by the host and passed to every
//! consumer explicitly; there is no global instance.

use std::sync::Arc;

use logpulse_core::error::Result;

use crate::config::ClientConfig;
use crate::hook::{HookOptions, RealtimeHook};
use crate::obs::{Notifier, TracingNotifier};
use crate::realtime::ConnectionManager;
use crate::services::LiveFeed;
use crate::transport::{Connector, WsConnector};

#[derive(Clone)]
pub struct AppState {
    manager: ConnectionManager,
    notifier: Arc<dyn Notifier>,
}

impl AppState {
    /// Build state with an explicit connector and notifier.
    /// Validates the config so a bad one fails here, not on first connect.
    pub fn new(cfg: ClientConfig, connector: Arc<dyn Connector>, notifier: Arc<dyn Notifier>) -> Result<Self> {
        cfg.validate()?;
        let manager = ConnectionManager::new(cfg, connector, Arc::clone(&notifier));
        Ok(Self { manager, notifier })
    }

    /// WebSocket transport and tracing notifications.
    pub fn with_websocket(cfg: ClientConfig) -> Result<Self> {
        let connector = Arc::new(WsConnector::new(cfg.client.connect_timeout()));
        Self::new(cfg, connector, Arc::new(TracingNotifier))
    }

    pub fn cfg(&self) -> &ClientConfig {
        self.manager.config()
    }

    pub fn manager(&self) -> &ConnectionManager {
        &self.manager
    }

    pub fn notifier(&self) -> Arc<dyn Notifier> {
        Arc::clone(&self.notifier)
    }

    pub async fn hook(&self, opts: HookOptions) -> RealtimeHook {
        RealtimeHook::mount(self.manager.clone(), opts).await
    }

    /// Attach a live feed to `hook`; it lives as long as the hook's handlers.
    pub fn live_feed(&self, hook: &RealtimeHook) -> LiveFeed {
        LiveFeed::attach(hook, self.notifier())
    }

    pub async fn start(&self) -> Result<()> {
        self.manager.connect().await
    }

    pub fn stop(&self) {
        self.manager.disconnect();
    }
}
