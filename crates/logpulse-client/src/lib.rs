//! logpulse realtime client library.
//!
//! Wires the transport, reconnecting connection manager, message router,
//! consumer hooks and the live security feed into one client stack. It is
//! consumed by the `logpulse-tail` binary (`main.rs`), by host applications
//! and by integration tests.

pub mod app_state;
pub mod config;
pub mod dispatch;
pub mod hook;
pub mod obs;
pub mod realtime;
pub mod services;
pub mod transport;

pub use app_state::AppState;
pub use dispatch::{handler, Handler, MessageRouter};
pub use hook::{HookOptions, RealtimeHook};
pub use realtime::{ConnectionManager, LifecycleEvent, ReadyState};
pub use services::LiveFeed;
