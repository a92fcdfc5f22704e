//! Realtime runtime: connection lifecycle, reconnect backoff and topic
//! subscriptions.

pub mod core;
pub mod types;

pub use self::core::{Backoff, ConnectionManager, SubscriptionSet};
pub use types::{ErrorHandler, LifecycleEvent, OpenHandler, ReadyState};
