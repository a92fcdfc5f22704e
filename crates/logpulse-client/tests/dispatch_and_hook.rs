#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]


use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;

use logpulse_client::{handler, ConnectionManager, HookOptions, RealtimeHook, ReadyState};
use logpulse_core::error::PulseError;
use logpulse_core::protocol::{Envelope, MessageKind};

use mock_transport::{mock, plain_config, RecordingNotifier};

fn manager() -> (ConnectionManager, tokio::sync::mpsc::UnboundedReceiver<mock_transport::MockPeer>) {
    let (conn, peers) = mock();
    let mgr = ConnectionManager::new(plain_config(), conn, Arc::new(RecordingNotifier::default()));
    (mgr, peers)
}

/// Handler that forwards every envelope it sees.
fn forward(tx: mpsc::UnboundedSender<Envelope>) -> logpulse_client::Handler {
    handler(move |env| {
        let _ = tx.send(env.clone());
        Ok(())
    })
}

#[tokio::test(start_paused = true)]
async fn failing_handler_does_not_block_the_next() {
    let (mgr, mut peers) = manager();
    let router = mgr.router();
    let (tx, mut rx) = mpsc::unbounded_channel();

    router.register(
        MessageKind::Alert,
        handler(|_| Err(PulseError::Handler("downstream unavailable".into()))),
    );
    router.register(MessageKind::Alert, forward(tx));

    mgr.connect().await.unwrap();
    let peer = peers.recv().await.unwrap();
    peer.push(r#"{"type":"alert","content":"cpu at 99%"}"#).await;

    let env = rx.recv().await.unwrap();
    assert_eq!(env.content, "cpu at 99%");
    assert!(mgr.is_connected());
}

#[tokio::test(start_paused = true)]
async fn malformed_and_unknown_frames_are_dropped() {
    let (mgr, mut peers) = manager();
    let router = mgr.router();
    let (tx, mut rx) = mpsc::unbounded_channel();
    router.register(MessageKind::Log, forward(tx));

    mgr.connect().await.unwrap();
    let peer = peers.recv().await.unwrap();
    peer.push("not json at all").await;
    peer.push(r#"{"content":"no type"}"#).await;
    peer.push(r#"{"type":"SOMETHING_NEW","content":"?"}"#).await;
    peer.push(r#"{"type":"log","content":"first good one"}"#).await;

    let env = rx.recv().await.unwrap();
    assert_eq!(env.content, "first good one");
    assert!(rx.try_recv().is_err());
    assert_eq!(mgr.state(), ReadyState::Open);
}

#[tokio::test(start_paused = true)]
async fn liveness_frames_are_not_dispatched() {
    let (mgr, mut peers) = manager();
    let router = mgr.router();
    let (tx, mut rx) = mpsc::unbounded_channel();
    router.register(MessageKind::Pong, forward(tx.clone()));
    router.register(MessageKind::Log, forward(tx));

    mgr.connect().await.unwrap();
    let before = mgr.last_liveness().unwrap();
    tokio::time::advance(std::time::Duration::from_secs(5)).await;

    let peer = peers.recv().await.unwrap();
    peer.push(r#"{"type":"pong"}"#).await;
    peer.push(r#"{"type":"log","content":"after pong"}"#).await;

    assert_eq!(rx.recv().await.unwrap().kind, MessageKind::Log);
    assert!(mgr.last_liveness().unwrap() > before);
}

#[tokio::test(start_paused = true)]
async fn hook_drop_unregisters_its_handlers() {
    let (mgr, _peers) = manager();
    let router = mgr.router();

    let outside = handler(|_| Ok(()));
    router.register(MessageKind::Log, Arc::clone(&outside));

    {
        let hook = RealtimeHook::mount(mgr.clone(), HookOptions::manual()).await;
        hook.on_message(MessageKind::Log, handler(|_| Ok(())));
        hook.on_message(MessageKind::Alert, handler(|_| Ok(())));
        hook.on_message("CUSTOM_TOPIC", handler(|_| Ok(())));
        assert_eq!(hook.tracked_handlers(), 3);
        assert_eq!(router.handler_count(&MessageKind::Log), 2);
        assert_eq!(hook.connection_state(), ReadyState::Closed);
    }

    assert_eq!(router.handler_count(&MessageKind::Log), 1);
    assert_eq!(router.handler_count(&MessageKind::Alert), 0);
    assert_eq!(router.handler_count(&MessageKind::from("CUSTOM_TOPIC")), 0);
}

#[tokio::test(start_paused = true)]
async fn off_message_removes_a_single_registration() {
    let (mgr, _peers) = manager();
    let hook = RealtimeHook::mount(mgr.clone(), HookOptions::manual()).await;
    let h = handler(|_| Ok(()));

    hook.on_message(MessageKind::Alert, Arc::clone(&h));
    hook.on_message(MessageKind::Alert, Arc::clone(&h));
    hook.off_message(MessageKind::Alert, &h);

    assert_eq!(hook.tracked_handlers(), 1);
    assert_eq!(mgr.router().handler_count(&MessageKind::Alert), 1);
}

#[tokio::test(start_paused = true)]
async fn mount_auto_connects_and_reports_through_callbacks() {
    let (mgr, _peers) = manager();
    let connected = Arc::new(AtomicBool::new(false));
    let c = Arc::clone(&connected);
    let disconnected = Arc::new(AtomicUsize::new(0));
    let d = Arc::clone(&disconnected);

    let hook = RealtimeHook::mount(
        mgr.clone(),
        HookOptions::default()
            .on_connect(move || c.store(true, Ordering::SeqCst))
            .on_disconnect(move || {
                d.fetch_add(1, Ordering::SeqCst);
            }),
    )
    .await;

    assert!(connected.load(Ordering::SeqCst));
    assert!(hook.is_connected());

    hook.disconnect();
    assert!(!hook.is_connected());
    assert_eq!(disconnected.load(Ordering::SeqCst), 1);
    assert_eq!(hook.send_ping().unwrap_err().code().as_str(), "NOT_CONNECTED");
}

#[tokio::test(start_paused = true)]
async fn failed_auto_connect_goes_to_on_error() {
    let (conn, _peers) = mock();
    conn.refuse(true);
    let mgr = ConnectionManager::new(plain_config(), conn, Arc::new(RecordingNotifier::default()));
    let errors = Arc::new(AtomicUsize::new(0));
    let e = Arc::clone(&errors);

    let hook = RealtimeHook::mount(
        mgr.clone(),
        HookOptions::default().on_error(move |err| {
            assert_eq!(err.code().as_str(), "TRANSPORT");
            e.fetch_add(1, Ordering::SeqCst);
        }),
    )
    .await;

    assert_eq!(errors.load(Ordering::SeqCst), 1);
    assert!(!hook.is_connected());
    hook.disconnect();
}

#[tokio::test(start_paused = true)]
async fn subscribe_on_plain_wire_is_a_protocol_error() {
    let (mgr, _peers) = manager();
    let hook = RealtimeHook::mount(mgr, HookOptions::manual()).await;
    assert_eq!(hook.subscribe("/topic/x").unwrap_err().code().as_str(), "PROTOCOL");
}
