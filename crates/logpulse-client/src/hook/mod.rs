//! Consumer hook: one component's view of the shared connection.
//!
//! A hook proxies the connection manager and router, tracks every handler it
//! registered, and unregisters all of them when dropped. Components mount a
//! hook, register handlers, and never have to clean up by hand.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::watch;

use logpulse_core::error::{PulseError, Result};
use logpulse_core::protocol::{MessageKind, OutboundMessage};

use crate::dispatch::{same_handler, Handler, MessageRouter};
use crate::realtime::{ConnectionManager, ReadyState};

type Callback = Arc<dyn Fn() + Send + Sync>;
type ErrorCallback = Arc<dyn Fn(&PulseError) + Send + Sync>;

/// Mount options.
#[derive(Clone)]
pub struct HookOptions {
    /// Connect once on mount (default true).
    pub auto_connect: bool,
    pub on_connect: Option<Callback>,
    pub on_disconnect: Option<Callback>,
    pub on_error: Option<ErrorCallback>,
}

impl Default for HookOptions {
    fn default() -> Self {
        Self {
            auto_connect: true,
            on_connect: None,
            on_disconnect: None,
            on_error: None,
        }
    }
}

impl HookOptions {
    pub fn manual() -> Self {
        Self {
            auto_connect: false,
            ..Self::default()
        }
    }

    pub fn on_connect<F: Fn() + Send + Sync + 'static>(mut self, f: F) -> Self {
        self.on_connect = Some(Arc::new(f));
        self
    }

    pub fn on_disconnect<F: Fn() + Send + Sync + 'static>(mut self, f: F) -> Self {
        self.on_disconnect = Some(Arc::new(f));
        self
    }

    pub fn on_error<F: Fn(&PulseError) + Send + Sync + 'static>(mut self, f: F) -> Self {
        self.on_error = Some(Arc::new(f));
        self
    }
}

pub struct RealtimeHook {
    manager: ConnectionManager,
    router: Arc<MessageRouter>,
    opts: HookOptions,
    state: watch::Receiver<ReadyState>,
    registered: Mutex<Vec<(MessageKind, Handler)>>,
}

impl RealtimeHook {
    /// Mount a hook; connects once when `opts.auto_connect` is set.
    /// A failed auto-connect is reported through `on_error` only.
    pub async fn mount(manager: ConnectionManager, opts: HookOptions) -> Self {
        let hook = Self {
            router: manager.router(),
            state: manager.state_watch(),
            manager,
            opts,
            registered: Mutex::new(Vec::new()),
        };
        if hook.opts.auto_connect {
            if let Err(e) = hook.connect().await {
                tracing::debug!(error = %e, "auto-connect on mount failed");
            }
        }
        hook
    }

    pub fn manager(&self) -> &ConnectionManager {
        &self.manager
    }

    pub fn is_connected(&self) -> bool {
        *self.state.borrow() == ReadyState::Open
    }

    pub fn connection_state(&self) -> ReadyState {
        *self.state.borrow()
    }

    /// Receiver that observes every state change.
    pub fn watch_state(&self) -> watch::Receiver<ReadyState> {
        self.state.clone()
    }

    pub async fn connect(&self) -> Result<()> {
        let res = self.manager.connect().await;
        self.after_connect(&res);
        res
    }

    pub fn disconnect(&self) {
        self.manager.disconnect();
        if let Some(cb) = &self.opts.on_disconnect {
            cb();
        }
    }

    pub async fn reconnect(&self) -> Result<()> {
        let res = self.manager.reconnect().await;
        self.after_connect(&res);
        res
    }

    fn after_connect(&self, res: &Result<()>) {
        match res {
            Ok(()) => {
                if let Some(cb) = &self.opts.on_connect {
                    cb();
                }
            }
            Err(e) => {
                if let Some(cb) = &self.opts.on_error {
                    cb(e);
                }
            }
        }
    }

    pub fn on_message(&self, kind: impl Into<MessageKind>, handler: Handler) {
        let kind = kind.into();
        self.router.register(kind.clone(), Arc::clone(&handler));
        self.tracked().push((kind, handler));
    }

    /// Remove one registration made through this hook.
    pub fn off_message(&self, kind: impl Into<MessageKind>, handler: &Handler) {
        let kind = kind.into();
        self.router.unregister(&kind, handler);
        let mut tracked = self.tracked();
        if let Some(pos) = tracked
            .iter()
            .position(|(k, h)| *k == kind && same_handler(h, handler))
        {
            tracked.remove(pos);
        }
    }

    /// Handlers currently registered through this hook.
    pub fn tracked_handlers(&self) -> usize {
        self.tracked().len()
    }

    pub fn send_message(&self, msg: OutboundMessage) -> Result<()> {
        self.manager.send(msg)
    }

    pub fn send_heartbeat(&self) -> Result<()> {
        self.manager.send_heartbeat()
    }

    pub fn send_ping(&self) -> Result<()> {
        self.manager.send_ping()
    }

    pub fn subscribe(&self, topic: &str) -> Result<()> {
        self.manager.subscribe(topic)
    }

    pub fn unsubscribe(&self, topic: &str) -> Result<()> {
        self.manager.unsubscribe(topic)
    }

    fn tracked(&self) -> std::sync::MutexGuard<'_, Vec<(MessageKind, Handler)>> {
        self.registered.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for RealtimeHook {
    fn drop(&mut self) {
        let tracked = std::mem::take(
            self.registered
                .get_mut()
                .unwrap_or_else(PoisonError::into_inner),
        );
        let n = tracked.len();
        for (kind, h) in tracked {
            self.router.unregister(&kind, &h);
        }
        tracing::debug!(handlers = n, "hook unmounted");
    }
}
