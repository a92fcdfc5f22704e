#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]


use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use logpulse_client::obs::NotifyLevel;
use logpulse_client::{ConnectionManager, LifecycleEvent, ReadyState};
use logpulse_core::protocol::{Envelope, MessageKind, OutboundMessage};

use mock_transport::{mock, ms, plain_config, RecordingNotifier};

#[tokio::test(start_paused = true)]
async fn backoff_grows_and_stops_after_max_attempts() {
    let (conn, _peers) = mock();
    conn.refuse(true);
    let notes = Arc::new(RecordingNotifier::default());
    let mgr = ConnectionManager::new(plain_config(), conn.clone(), notes.clone());
    let mut events = mgr.events();

    let err = mgr.connect().await.unwrap_err();
    assert_eq!(err.code().as_str(), "TRANSPORT");
    assert_eq!(mgr.state(), ReadyState::Closed);
    assert_eq!(mgr.pending_reconnect(), Some((1, Duration::from_millis(1000))));

    let mut delays = Vec::new();
    loop {
        match events.recv().await.unwrap() {
            LifecycleEvent::ReconnectScheduled { delay, .. } => delays.push(ms(delay)),
            LifecycleEvent::RetryExhausted { attempts } => {
                assert_eq!(attempts, 3);
                break;
            }
            _ => {}
        }
    }

    assert_eq!(delays, vec![1000, 2000, 4000]);
    assert_eq!(conn.open_calls(), 4);
    assert_eq!(mgr.pending_reconnect(), None);

    // Nothing else is ever scheduled.
    tokio::time::sleep(Duration::from_secs(600)).await;
    assert_eq!(conn.open_calls(), 4);
    assert_eq!(notes.levels(), vec![NotifyLevel::Warning, NotifyLevel::Error]);
}

#[tokio::test(start_paused = true)]
async fn disconnect_cancels_pending_reconnect() {
    let (conn, _peers) = mock();
    conn.refuse(true);
    let mgr = ConnectionManager::new(plain_config(), conn.clone(), Arc::new(RecordingNotifier::default()));

    assert!(mgr.connect().await.is_err());
    assert!(mgr.pending_reconnect().is_some());

    mgr.disconnect();
    assert_eq!(mgr.pending_reconnect(), None);
    assert_eq!(mgr.state(), ReadyState::Closed);

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(conn.open_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn disconnect_of_open_session_never_retries() {
    let (conn, mut peers) = mock();
    let mgr = ConnectionManager::new(plain_config(), conn.clone(), Arc::new(RecordingNotifier::default()));

    mgr.connect().await.unwrap();
    let mut peer = peers.recv().await.unwrap();
    assert!(mgr.is_connected());

    mgr.disconnect();
    assert_eq!(mgr.state(), ReadyState::Closed);
    assert!(peer.saw_close());

    // A close reported after the fact belongs to a dead session.
    peer.close(1000, "bye").await;
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(conn.open_calls(), 1);
    assert_eq!(mgr.pending_reconnect(), None);
}

#[tokio::test(start_paused = true)]
async fn unexpected_close_reconnects_and_resets_attempts() {
    let (conn, mut peers) = mock();
    let notes = Arc::new(RecordingNotifier::default());
    let mgr = ConnectionManager::new(plain_config(), conn.clone(), notes.clone());
    let opened = Arc::new(AtomicUsize::new(0));
    let o = Arc::clone(&opened);
    mgr.on_connect(move || {
        o.fetch_add(1, Ordering::SeqCst);
    });
    let mut events = mgr.events();

    mgr.connect().await.unwrap();
    let peer = peers.recv().await.unwrap();
    peer.close(1006, "abnormal").await;

    let mut saw_closed = false;
    loop {
        match events.recv().await.unwrap() {
            LifecycleEvent::Closed { code, .. } => {
                assert_eq!(code, Some(1006));
                saw_closed = true;
            }
            LifecycleEvent::ReconnectScheduled { attempt, delay } => {
                assert_eq!((attempt, ms(delay)), (1, 1000));
            }
            LifecycleEvent::Open if saw_closed => break,
            _ => {}
        }
    }

    let _second = peers.recv().await.unwrap();
    assert!(mgr.is_connected());
    assert_eq!(mgr.reconnect_attempts(), 0);
    assert_eq!(opened.load(Ordering::SeqCst), 2);
    // Success only for the first connect; the recovery is silent.
    assert_eq!(notes.levels(), vec![NotifyLevel::Success, NotifyLevel::Warning]);
}

#[tokio::test(start_paused = true)]
async fn connect_is_idempotent_while_open() {
    let (conn, _peers) = mock();
    let mgr = ConnectionManager::new(plain_config(), conn.clone(), Arc::new(RecordingNotifier::default()));

    mgr.connect().await.unwrap();
    mgr.connect().await.unwrap();
    assert_eq!(conn.open_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn manual_reconnect_resets_exhausted_counter() {
    let (conn, mut peers) = mock();
    conn.refuse(true);
    let mgr = ConnectionManager::new(plain_config(), conn.clone(), Arc::new(RecordingNotifier::default()));
    let mut events = mgr.events();

    let _ = mgr.connect().await;
    while !matches!(events.recv().await.unwrap(), LifecycleEvent::RetryExhausted { .. }) {}
    assert_eq!(mgr.reconnect_attempts(), 4);

    conn.refuse(false);
    mgr.reconnect().await.unwrap();
    assert!(peers.recv().await.is_some());
    assert!(mgr.is_connected());
    assert_eq!(mgr.reconnect_attempts(), 0);
}

#[tokio::test(start_paused = true)]
async fn state_watch_follows_transitions() {
    let (conn, _peers) = mock();
    let mgr = ConnectionManager::new(plain_config(), conn.clone(), Arc::new(RecordingNotifier::default()));
    let rx = mgr.state_watch();
    assert_eq!(*rx.borrow(), ReadyState::Closed);

    mgr.connect().await.unwrap();
    assert_eq!(*rx.borrow(), ReadyState::Open);
    assert_eq!(ReadyState::Open.as_u8(), 1);

    mgr.disconnect();
    assert_eq!(*rx.borrow(), ReadyState::Closed);
}

#[tokio::test(start_paused = true)]
async fn send_fills_envelope_defaults() {
    let (conn, mut peers) = mock();
    let mgr = ConnectionManager::new(plain_config(), conn.clone(), Arc::new(RecordingNotifier::default()));
    mgr.connect().await.unwrap();
    let mut peer = peers.recv().await.unwrap();

    mgr.send(OutboundMessage::new(MessageKind::Log).content("hello")).unwrap();
    let env = Envelope::from_json(&peer.recv_text().await).unwrap();
    assert_eq!(env.kind, MessageKind::Log);
    assert_eq!(env.content, "hello");
    assert_eq!(env.sender, "client");
    assert!(chrono::DateTime::parse_from_rfc3339(&env.timestamp).is_ok());

    mgr.send(OutboundMessage::default()).unwrap();
    let env = Envelope::from_json(&peer.recv_text().await).unwrap();
    assert_eq!(env.kind, MessageKind::Custom);
    assert_eq!(env.content, "");

    mgr.send(OutboundMessage::new("BESPOKE").timestamp("2024-01-01T00:00:00.000Z")).unwrap();
    let env = Envelope::from_json(&peer.recv_text().await).unwrap();
    assert_eq!(env.kind.as_str(), "BESPOKE");
    assert_eq!(env.timestamp, "2024-01-01T00:00:00.000Z");

    mgr.send_heartbeat().unwrap();
    let env = Envelope::from_json(&peer.recv_text().await).unwrap();
    assert_eq!((env.kind, env.content.as_str()), (MessageKind::Heartbeat, "ping"));
}

#[tokio::test(start_paused = true)]
async fn send_without_connection_is_rejected() {
    let (conn, _peers) = mock();
    let mgr = ConnectionManager::new(plain_config(), conn, Arc::new(RecordingNotifier::default()));
    let err = mgr.send(OutboundMessage::new(MessageKind::Log)).unwrap_err();
    assert_eq!(err.code().as_str(), "NOT_CONNECTED");
}

#[tokio::test(start_paused = true)]
async fn heartbeat_is_sent_on_interval() {
    let (conn, mut peers) = mock();
    let mut cfg = plain_config();
    cfg.client.heartbeat_interval_ms = 30000;
    let mgr = ConnectionManager::new(cfg, conn, Arc::new(RecordingNotifier::default()));
    mgr.connect().await.unwrap();
    let mut peer = peers.recv().await.unwrap();

    let started = tokio::time::Instant::now();
    let env = Envelope::from_json(&peer.recv_text().await).unwrap();
    assert_eq!(env.kind, MessageKind::Heartbeat);
    assert!(started.elapsed() >= Duration::from_secs(30));
}

#[tokio::test(start_paused = true)]
async fn probe_reports_reachability() {
    let (conn, _peers) = mock();
    let mgr = ConnectionManager::new(plain_config(), conn.clone(), Arc::new(RecordingNotifier::default()));
    assert!(mgr.probe(Duration::from_secs(5)).await);
    conn.refuse(true);
    assert!(!mgr.probe(Duration::from_secs(5)).await);
    assert_eq!(mgr.state(), ReadyState::Closed);
}
