//! Connection manager.
//!
//! Owns one transport session at a time and drives its lifecycle:
//! - `connect()` opens a session (STOMP: CONNECT/CONNECTED handshake, then
//!   SUBSCRIBE every topic)
//! - a per-session pump task decodes inbound frames and dispatches them
//! - unexpected close/error schedules a reconnect with exponential backoff
//! - `disconnect()` is the only way to suppress automatic reconnection
//!
//! Every session carries a generation number. Anything that reports back
//! from a session (pump events, a finished `open()`, a handshake) is ignored
//! once the generation moved on, so a torn-down session can never resurrect
//! state or schedule retries.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};

use logpulse_core::error::{PulseError, Result};
use logpulse_core::protocol::stomp::{self, StompFrame, HEARTBEAT_FRAME};
use logpulse_core::protocol::topic::normalize_topic_body;
use logpulse_core::protocol::OutboundMessage;

use crate::config::{ClientConfig, WireMode};
use crate::dispatch::MessageRouter;
use crate::obs::{NotifyLevel, Notifier};
use crate::realtime::core::{Backoff, SubscriptionSet};
use crate::realtime::types::{ErrorHandler, LifecycleEvent, OpenHandler, ReadyState};
use crate::transport::codec::{self, Inbound};
use crate::transport::{self, Connector, Outbound, TransportEvent};

const EVENT_CAPACITY: usize = 64;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

// --------------------
// Session bookkeeping
// --------------------
struct LinkHandle {
    outbound: mpsc::Sender<Outbound>,
    pump: Option<JoinHandle<()>>,
}

struct PendingReconnect {
    id: u64,
    attempt: u32,
    delay: Duration,
    handle: JoinHandle<()>,
}

struct SessionState {
    generation: u64,
    attempts: u32,
    exhausted: bool,
    link: Option<LinkHandle>,
    reconnect: Option<PendingReconnect>,
    next_timer_id: u64,
    /// STOMP only: resolves `connect()` once CONNECTED arrives.
    pending_open: Option<oneshot::Sender<Result<()>>>,
    last_liveness: Option<Instant>,
    subscriptions: SubscriptionSet,
}

struct Inner {
    cfg: ClientConfig,
    connector: Arc<dyn Connector>,
    router: Arc<MessageRouter>,
    notifier: Arc<dyn Notifier>,
    backoff: Backoff,
    state_tx: watch::Sender<ReadyState>,
    events_tx: broadcast::Sender<LifecycleEvent>,
    session: Mutex<SessionState>,
    open_handlers: Mutex<Vec<OpenHandler>>,
    error_handlers: Mutex<Vec<ErrorHandler>>,
}

/// Reconnecting realtime connection.
///
/// Cheap to clone; all clones share one session. Background tasks only hold
/// weak references, so dropping the last clone tears the session down.
#[derive(Clone)]
pub struct ConnectionManager {
    inner: Arc<Inner>,
}

impl ConnectionManager {
    pub fn new(cfg: ClientConfig, connector: Arc<dyn Connector>, notifier: Arc<dyn Notifier>) -> Self {
        let (state_tx, _) = watch::channel(ReadyState::Closed);
        let (events_tx, _) = broadcast::channel(EVENT_CAPACITY);
        let backoff = Backoff::from_config(&cfg.reconnect);
        let subscriptions = SubscriptionSet::new(cfg.stomp.topics.clone());

        Self {
            inner: Arc::new(Inner {
                cfg,
                connector,
                router: Arc::new(MessageRouter::new()),
                notifier,
                backoff,
                state_tx,
                events_tx,
                session: Mutex::new(SessionState {
                    generation: 0,
                    attempts: 0,
                    exhausted: false,
                    link: None,
                    reconnect: None,
                    next_timer_id: 0,
                    pending_open: None,
                    last_liveness: None,
                    subscriptions,
                }),
                open_handlers: Mutex::new(Vec::new()),
                error_handlers: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.cfg
    }

    pub fn router(&self) -> Arc<MessageRouter> {
        Arc::clone(&self.inner.router)
    }

    /// Open a session. No-op while connecting or open.
    ///
    /// Resolves once the session is usable (plain: socket open, STOMP:
    /// CONNECTED received). A failure also schedules a backoff retry.
    pub async fn connect(&self) -> Result<()> {
        self.inner.connect().await
    }

    /// Tear down the session and cancel any pending reconnect.
    pub fn disconnect(&self) {
        self.inner.disconnect();
    }

    /// Disconnect, reset the attempt counter, pause briefly, connect.
    pub async fn reconnect(&self) -> Result<()> {
        self.inner.attempt_connection(true).await
    }

    /// Send a message; unset fields are defaulted.
    pub fn send(&self, msg: OutboundMessage) -> Result<()> {
        self.inner.send(msg)
    }

    pub fn send_heartbeat(&self) -> Result<()> {
        self.inner.send(OutboundMessage::heartbeat())
    }

    pub fn send_ping(&self) -> Result<()> {
        self.inner.send(OutboundMessage::ping())
    }

    /// Add a topic subscription (STOMP only). Bound right away when open,
    /// otherwise on the next session open.
    pub fn subscribe(&self, topic: &str) -> Result<()> {
        self.inner.subscribe(topic)
    }

    /// Drop a runtime-added topic (STOMP only). Configured topics stay.
    pub fn unsubscribe(&self, topic: &str) -> Result<()> {
        self.inner.unsubscribe(topic)
    }

    pub fn topics(&self) -> Vec<String> {
        lock(&self.inner.session).subscriptions.topics().cloned().collect()
    }

    pub fn on_connect<F>(&self, f: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        lock(&self.inner.open_handlers).push(Arc::new(f));
    }

    pub fn on_error<F>(&self, f: F)
    where
        F: Fn(&PulseError) + Send + Sync + 'static,
    {
        lock(&self.inner.error_handlers).push(Arc::new(f));
    }

    pub fn state(&self) -> ReadyState {
        *self.inner.state_tx.borrow()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ReadyState::Open
    }

    pub fn state_watch(&self) -> watch::Receiver<ReadyState> {
        self.inner.state_tx.subscribe()
    }

    pub fn events(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.inner.events_tx.subscribe()
    }

    pub fn reconnect_attempts(&self) -> u32 {
        lock(&self.inner.session).attempts
    }

    /// Attempt number and delay of the scheduled reconnect, if any.
    pub fn pending_reconnect(&self) -> Option<(u32, Duration)> {
        lock(&self.inner.session)
            .reconnect
            .as_ref()
            .map(|p| (p.attempt, p.delay))
    }

    /// Last time the server proved it was alive (pong/heartbeat/frame).
    pub fn last_liveness(&self) -> Option<Instant> {
        lock(&self.inner.session).last_liveness
    }

    /// One-shot reachability check of the configured URL.
    pub async fn probe(&self, timeout: Duration) -> bool {
        transport::probe(self.inner.connector.as_ref(), &self.inner.cfg.client.url, timeout).await
    }
}

// --------------------
// Lifecycle
// --------------------
impl Inner {
    fn state(&self) -> ReadyState {
        *self.state_tx.borrow()
    }

    fn set_state(&self, next: ReadyState) {
        self.state_tx.send_if_modified(|cur| {
            if *cur == next {
                return false;
            }
            *cur = next;
            true
        });
    }

    fn emit(&self, ev: LifecycleEvent) {
        let _ = self.events_tx.send(ev);
    }

    fn is_stomp(&self) -> bool {
        self.cfg.client.wire == WireMode::Stomp
    }

    async fn attempt_connection(self: &Arc<Self>, reset_attempts: bool) -> Result<()> {
        if reset_attempts {
            self.disconnect();
            {
                let mut s = lock(&self.session);
                s.attempts = 0;
                s.exhausted = false;
            }
            tokio::time::sleep(Duration::from_millis(self.cfg.reconnect.manual_delay_ms)).await;
        }
        self.connect().await
    }

    async fn connect(self: &Arc<Self>) -> Result<()> {
        let (gen, attempt) = {
            let mut s = lock(&self.session);
            if matches!(self.state(), ReadyState::Connecting | ReadyState::Open) {
                return Ok(());
            }
            s.generation += 1;
            if let Some(pending) = s.reconnect.take() {
                pending.handle.abort();
            }
            self.set_state(ReadyState::Connecting);
            (s.generation, s.attempts)
        };

        let url = &self.cfg.client.url;
        tracing::info!(url = %url, attempt, "connecting");
        self.emit(LifecycleEvent::Connecting { attempt });

        let link = match self.connector.open(url).await {
            Ok(link) => link,
            Err(e) => {
                let current = lock(&self.session).generation == gen;
                if current {
                    tracing::warn!(url = %url, code = e.code().as_str(), error = %e, "connect failed");
                    self.set_state(ReadyState::Closed);
                    self.fire_error(&e);
                    self.schedule_reconnect(gen);
                }
                return Err(e);
            }
        };

        let handshake = {
            let mut s = lock(&self.session);
            if s.generation != gen {
                drop(s);
                let _ = link.outbound.try_send(Outbound::Close);
                return Err(PulseError::Transport("connect cancelled".into()));
            }

            let plain_heartbeat = if self.is_stomp() {
                None
            } else {
                self.cfg.client.heartbeat_interval()
            };
            let pump = tokio::spawn(pump(Arc::downgrade(self), gen, link.events, plain_heartbeat));
            s.link = Some(LinkHandle {
                outbound: link.outbound.clone(),
                pump: Some(pump),
            });

            if self.is_stomp() {
                let (tx, rx) = oneshot::channel();
                s.pending_open = Some(tx);
                let st = &self.cfg.stomp;
                let frame = StompFrame::connect(
                    &st.host_for(url),
                    st.heartbeat_outgoing_ms,
                    st.heartbeat_incoming_ms,
                );
                if let Err(e) = link.outbound.try_send(Outbound::Text(frame.encode())) {
                    tracing::warn!(error = %e, "failed to queue CONNECT frame");
                }
                Some(rx)
            } else {
                let recovered = self.mark_open(&mut s);
                drop(s);
                self.announce_open(recovered);
                None
            }
        };

        let Some(rx) = handshake else { return Ok(()) };

        match tokio::time::timeout(self.cfg.client.connect_timeout(), rx).await {
            Ok(Ok(res)) => res,
            Ok(Err(_)) => Err(PulseError::Transport("connect cancelled".into())),
            Err(_) => {
                let e = PulseError::Protocol("STOMP handshake timed out".into());
                self.force_close(gen, e.clone());
                Err(e)
            }
        }
    }

    /// Session became usable. Returns whether this ended a reconnect episode.
    fn mark_open(&self, s: &mut SessionState) -> bool {
        self.set_state(ReadyState::Open);
        let recovered = s.attempts > 0;
        s.attempts = 0;
        s.exhausted = false;
        s.last_liveness = Some(Instant::now());

        if self.is_stomp() {
            let frames = s.subscriptions.establish();
            if let Some(link) = &s.link {
                for f in frames {
                    if let Err(e) = link.outbound.try_send(Outbound::Text(f.encode())) {
                        tracing::warn!(error = %e, "failed to queue SUBSCRIBE frame");
                    }
                }
            }
            if let Some(tx) = s.pending_open.take() {
                let _ = tx.send(Ok(()));
            }
        }
        recovered
    }

    fn announce_open(&self, recovered: bool) {
        tracing::info!(url = %self.cfg.client.url, recovered, "connected");
        if !recovered {
            self.notifier.notify(NotifyLevel::Success, "realtime connection established");
        }
        self.emit(LifecycleEvent::Open);

        let handlers = lock(&self.open_handlers).clone();
        for h in handlers {
            if catch_unwind(AssertUnwindSafe(|| h())).is_err() {
                tracing::error!("on_connect handler panicked");
            }
        }
    }

    fn fire_error(&self, e: &PulseError) {
        let handlers = lock(&self.error_handlers).clone();
        for h in handlers {
            if catch_unwind(AssertUnwindSafe(|| h(e))).is_err() {
                tracing::error!(code = e.code().as_str(), "on_error handler panicked");
            }
        }
    }

    /// Close the socket from our side and treat it as an unexpected drop.
    fn force_close(self: &Arc<Self>, gen: u64, cause: PulseError) {
        {
            let s = lock(&self.session);
            if s.generation != gen {
                return;
            }
            if let Some(link) = &s.link {
                let _ = link.outbound.try_send(Outbound::Close);
            }
        }
        self.handle_drop(gen, None, cause.to_string(), Some(cause));
    }

    fn handle_drop(self: &Arc<Self>, gen: u64, code: Option<u16>, reason: String, error: Option<PulseError>) {
        {
            let mut s = lock(&self.session);
            if s.generation != gen {
                return;
            }
            if let Some(link) = s.link.take() {
                if let Some(pump) = link.pump {
                    pump.abort();
                }
            }
            s.subscriptions.clear_bindings();
            if let Some(tx) = s.pending_open.take() {
                let cause = error
                    .clone()
                    .unwrap_or_else(|| PulseError::Transport(format!("closed during handshake: {reason}")));
                let _ = tx.send(Err(cause));
            }
            self.set_state(ReadyState::Closed);
        }

        tracing::warn!(url = %self.cfg.client.url, ?code, reason = %reason, "connection lost");
        self.emit(LifecycleEvent::Closed { code, reason });
        if let Some(e) = &error {
            self.fire_error(e);
        }
        self.schedule_reconnect(gen);
    }

    fn schedule_reconnect(self: &Arc<Self>, gen: u64) {
        let mut s = lock(&self.session);
        if s.generation != gen {
            return;
        }
        s.attempts += 1;
        let attempt = s.attempts;
        let max = self.backoff.max_attempts();

        let Some(delay) = self.backoff.delay_for(attempt) else {
            let first = !s.exhausted;
            s.exhausted = true;
            drop(s);
            if first {
                tracing::error!(url = %self.cfg.client.url, attempts = max, "reconnect attempts exhausted");
                self.notifier.notify(
                    NotifyLevel::Error,
                    &format!("realtime connection failed after {max} attempts"),
                );
                self.emit(LifecycleEvent::RetryExhausted { attempts: max });
            }
            return;
        };

        if let Some(old) = s.reconnect.take() {
            old.handle.abort();
        }
        let id = s.next_timer_id;
        s.next_timer_id += 1;

        let weak = Arc::downgrade(self);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let Some(inner) = weak.upgrade() else { return };
            {
                let mut s = lock(&inner.session);
                match &s.reconnect {
                    Some(p) if p.id == id => s.reconnect = None,
                    _ => return,
                }
            }
            if let Err(e) = inner.attempt_connection(false).await {
                tracing::debug!(attempt, error = %e, "reconnect attempt failed");
            }
        });
        s.reconnect = Some(PendingReconnect {
            id,
            attempt,
            delay,
            handle,
        });
        drop(s);

        tracing::info!(attempt, max, delay_ms = delay.as_millis() as u64, "reconnect scheduled");
        if attempt == 1 {
            self.notifier.notify(
                NotifyLevel::Warning,
                &format!("realtime connection lost, reconnecting ({attempt}/{max})"),
            );
        }
        self.emit(LifecycleEvent::ReconnectScheduled { attempt, delay });
    }

    fn disconnect(&self) {
        let had_link = {
            let mut s = lock(&self.session);
            s.generation += 1;
            if let Some(pending) = s.reconnect.take() {
                pending.handle.abort();
            }
            if let Some(tx) = s.pending_open.take() {
                let _ = tx.send(Err(PulseError::Transport("disconnected".into())));
            }
            s.subscriptions.clear_bindings();

            let link = s.link.take();
            let had_link = link.is_some();
            if let Some(link) = link {
                self.set_state(ReadyState::Closing);
                if self.is_stomp() {
                    let _ = link
                        .outbound
                        .try_send(Outbound::Text(StompFrame::disconnect().encode()));
                }
                if let Err(e) = link.outbound.try_send(Outbound::Close) {
                    tracing::debug!(error = %e, "close on teardown failed");
                }
                if let Some(pump) = link.pump {
                    pump.abort();
                }
            }
            self.set_state(ReadyState::Closed);
            had_link
        };

        tracing::info!(url = %self.cfg.client.url, had_link, "disconnected");
        if had_link {
            self.emit(LifecycleEvent::Closed {
                code: None,
                reason: "client disconnect".into(),
            });
        }
    }
}

// --------------------
// Outbound
// --------------------
impl Inner {
    fn send(&self, msg: OutboundMessage) -> Result<()> {
        let env = msg.into_envelope();
        let text = if self.is_stomp() {
            codec::encode_stomp_send(&self.cfg.stomp.publish_destination, &env)?
        } else {
            codec::encode_plain(&env)?
        };
        self.send_text(text, env.kind.as_str())
    }

    fn send_text(&self, text: String, what: &str) -> Result<()> {
        let s = lock(&self.session);
        let link = match (&s.link, self.state()) {
            (Some(link), ReadyState::Open) => link,
            _ => {
                tracing::warn!(kind = %what, state = %self.state(), "not connected, message dropped");
                return Err(PulseError::NotConnected);
            }
        };
        link.outbound
            .try_send(Outbound::Text(text))
            .map_err(|e| PulseError::Transport(format!("outbound queue: {e}")))
    }

    fn require_stomp(&self) -> Result<()> {
        if self.is_stomp() {
            Ok(())
        } else {
            Err(PulseError::Protocol("topic subscriptions require the stomp wire".into()))
        }
    }

    fn subscribe(&self, topic: &str) -> Result<()> {
        self.require_stomp()?;
        let mut s = lock(&self.session);
        let open = self.state() == ReadyState::Open && s.link.is_some();
        if let Some(frame) = s.subscriptions.add(topic, open) {
            queue_frame(&s, frame);
        }
        tracing::info!(topic = %topic, bound = open, "topic subscribed");
        Ok(())
    }

    fn unsubscribe(&self, topic: &str) -> Result<()> {
        self.require_stomp()?;
        let mut s = lock(&self.session);
        if s.subscriptions.is_fixed(topic) {
            tracing::debug!(topic = %topic, "configured topic cannot be unsubscribed");
            return Ok(());
        }
        if let Some(frame) = s.subscriptions.remove(topic) {
            queue_frame(&s, frame);
        }
        Ok(())
    }
}

fn queue_frame(s: &SessionState, frame: StompFrame) {
    if let Some(link) = &s.link {
        if let Err(e) = link.outbound.try_send(Outbound::Text(frame.encode())) {
            tracing::warn!(command = %frame.command, error = %e, "failed to queue frame");
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        let s = self.session.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(pending) = s.reconnect.take() {
            pending.handle.abort();
        }
        if let Some(link) = s.link.take() {
            let _ = link.outbound.try_send(Outbound::Close);
            if let Some(pump) = link.pump {
                pump.abort();
            }
        }
    }
}

// --------------------
// Inbound pump
// --------------------
enum Flow {
    Continue,
    Stop,
}

fn heartbeat_interval(period: Duration) -> Interval {
    let mut iv = tokio::time::interval_at(Instant::now() + period, period);
    iv.set_missed_tick_behavior(MissedTickBehavior::Delay);
    iv
}

async fn next_tick(hb: &mut Option<Interval>) {
    match hb {
        Some(iv) => {
            iv.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

async fn pump(
    inner: Weak<Inner>,
    gen: u64,
    mut events: mpsc::Receiver<TransportEvent>,
    plain_heartbeat: Option<Duration>,
) {
    let mut heartbeat = plain_heartbeat.map(heartbeat_interval);

    loop {
        tokio::select! {
            ev = events.recv() => {
                let Some(inner) = inner.upgrade() else { break };
                match ev {
                    Some(TransportEvent::Frame(text)) => {
                        if let Flow::Stop = inner.on_frame(gen, &text, &mut heartbeat) {
                            break;
                        }
                    }
                    Some(TransportEvent::Closed { code, reason }) => {
                        inner.handle_drop(gen, code, reason, None);
                        break;
                    }
                    Some(TransportEvent::Error(e)) => {
                        let err = PulseError::Transport(e);
                        inner.handle_drop(gen, None, err.to_string(), Some(err));
                        break;
                    }
                    None => {
                        inner.handle_drop(gen, None, "transport ended".into(), None);
                        break;
                    }
                }
            }

            _ = next_tick(&mut heartbeat) => {
                let Some(inner) = inner.upgrade() else { break };
                let sent = if inner.is_stomp() {
                    inner.send_text(HEARTBEAT_FRAME.to_string(), "heart-beat")
                } else {
                    inner.send(OutboundMessage::heartbeat())
                };
                if let Err(e) = sent {
                    tracing::debug!(error = %e, "heartbeat not sent");
                }
            }
        }
    }
}

impl Inner {
    fn touch(&self) {
        lock(&self.session).last_liveness = Some(Instant::now());
    }

    fn on_frame(self: &Arc<Self>, gen: u64, text: &str, heartbeat: &mut Option<Interval>) -> Flow {
        if lock(&self.session).generation != gen {
            return Flow::Stop;
        }
        if self.is_stomp() {
            self.on_stomp_frame(gen, text, heartbeat)
        } else {
            self.on_plain_frame(text);
            Flow::Continue
        }
    }

    fn on_plain_frame(&self, text: &str) {
        let env = match codec::decode_plain(text) {
            Ok(Inbound::Envelope(env)) => env,
            Ok(_) => return,
            Err(e) => {
                tracing::warn!(code = e.code().as_str(), error = %e, "malformed frame dropped");
                return;
            }
        };

        if env.kind.is_liveness() {
            tracing::trace!(kind = %env.kind, "liveness frame");
            self.touch();
            return;
        }
        self.router.dispatch(&env);
    }

    /// CONNECT sent, CONNECTED not yet received.
    fn handshaking(&self, gen: u64) -> bool {
        let s = lock(&self.session);
        s.generation == gen && s.pending_open.is_some()
    }

    fn on_stomp_frame(self: &Arc<Self>, gen: u64, text: &str, heartbeat: &mut Option<Interval>) -> Flow {
        for item in codec::decode_stomp(text) {
            let handshaking = self.handshaking(gen);
            let item = match item {
                Ok(item) => item,
                Err(e) if handshaking => {
                    tracing::error!(code = e.code().as_str(), error = %e, "malformed handshake reply");
                    self.force_close(gen, PulseError::Protocol(format!("malformed handshake reply: {e}")));
                    return Flow::Stop;
                }
                Err(e) => {
                    tracing::warn!(code = e.code().as_str(), error = %e, "malformed stomp frame dropped");
                    continue;
                }
            };

            if handshaking
                && !matches!(
                    item,
                    Inbound::Connected { .. } | Inbound::ServerError { .. } | Inbound::Heartbeat
                )
            {
                tracing::error!(?item, "unexpected handshake reply");
                self.force_close(gen, PulseError::Protocol("expected CONNECTED in reply to CONNECT".into()));
                return Flow::Stop;
            }

            match item {
                Inbound::Heartbeat | Inbound::Receipt => self.touch(),
                Inbound::Connected { heartbeat: server } => {
                    let st = &self.cfg.stomp;
                    let (send_every, _) = stomp::negotiate_heartbeat(
                        st.heartbeat_outgoing_ms,
                        st.heartbeat_incoming_ms,
                        server.as_deref(),
                    );
                    *heartbeat = (send_every > 0).then(|| heartbeat_interval(Duration::from_millis(send_every)));

                    let recovered = {
                        let mut s = lock(&self.session);
                        if s.generation != gen {
                            return Flow::Stop;
                        }
                        self.mark_open(&mut s)
                    };
                    self.announce_open(recovered);
                }
                Inbound::Message {
                    subscription,
                    destination,
                    body,
                } => {
                    let topic = {
                        let mut s = lock(&self.session);
                        s.last_liveness = Some(Instant::now());
                        subscription
                            .as_deref()
                            .and_then(|id| s.subscriptions.resolve(id))
                            .map(str::to_string)
                            .or(destination)
                    };
                    let Some(topic) = topic else {
                        tracing::warn!(?subscription, "message without resolvable topic dropped");
                        continue;
                    };
                    match normalize_topic_body(&topic, &body) {
                        Ok(env) => {
                            self.router.dispatch(&env);
                        }
                        Err(e) => {
                            tracing::warn!(topic = %topic, code = e.code().as_str(), error = %e, "topic body dropped");
                        }
                    }
                }
                Inbound::ServerError { message } => {
                    tracing::error!(message = %message, "server sent ERROR frame");
                    self.force_close(gen, PulseError::Protocol(message));
                    return Flow::Stop;
                }
                Inbound::Envelope(_) => {}
            }
        }
        Flow::Continue
    }
}
