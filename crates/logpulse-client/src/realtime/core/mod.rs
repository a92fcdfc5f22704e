//! Realtime core components.
//!
//! Reconnect backoff, the STOMP subscription set, and the connection manager
//! that drives both.

mod backoff;
mod connection;
mod subscriptions;

pub use backoff::Backoff;
pub use connection::ConnectionManager;
pub use subscriptions::SubscriptionSet;
