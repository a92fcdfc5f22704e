//! logpulse-tail
//!
//! Connects to the configured realtime endpoint, attaches a live feed and
//! logs every message until Ctrl-C.
//! - config path: first CLI argument, default `logpulse.yaml`
//! - log filter: `RUST_LOG`

use std::process::ExitCode;

use tracing_subscriber::{fmt, EnvFilter};

use logpulse_client::{app_state::AppState, config, handler, HookOptions};
use logpulse_core::protocol::MessageKind;

/// Kinds worth echoing in the tail output.
const TAILED: [MessageKind; 11] = [
    MessageKind::Log,
    MessageKind::Alert,
    MessageKind::System,
    MessageKind::Custom,
    MessageKind::NewLogs,
    MessageKind::SingleLog,
    MessageKind::SecurityAlert,
    MessageKind::Statistics,
    MessageKind::SystemNotification,
    MessageKind::SystemInfo,
    MessageKind::SystemError,
];

#[tokio::main]
async fn main() -> ExitCode {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let path = std::env::args().nth(1).unwrap_or_else(|| "logpulse.yaml".to_string());
    let cfg = match config::load_from_file(&path) {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!(path = %path, code = e.code().as_str(), error = %e, "config load failed");
            return ExitCode::FAILURE;
        }
    };

    let state = match AppState::with_websocket(cfg) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "client init failed");
            return ExitCode::FAILURE;
        }
    };

    tracing::info!(url = %state.cfg().client.url, wire = ?state.cfg().client.wire, "logpulse-tail starting");

    let hook = state
        .hook(HookOptions::default().on_error(|e| {
            tracing::warn!(code = e.code().as_str(), error = %e, "initial connect failed, retrying in background");
        }))
        .await;
    let feed = state.live_feed(&hook);

    for kind in TAILED {
        hook.on_message(
            kind,
            handler(|env| {
                tracing::info!(
                    kind = %env.kind,
                    topic = env.topic.as_deref().unwrap_or("-"),
                    sender = %env.sender,
                    "{}",
                    env.content
                );
                Ok(())
            }),
        );
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "signal handler failed");
    }

    let snap = feed.snapshot();
    tracing::info!(
        logs = snap.logs.len(),
        alerts = snap.alerts.len(),
        has_statistics = snap.statistics.is_some(),
        "shutting down"
    );
    drop(hook);
    state.stop();
    ExitCode::SUCCESS
}
