//! Observability surface: user-facing notifications.
//!
//! The host UI supplies a `Notifier`; the default one writes through `tracing`.

pub mod notify;

pub use notify::{Notifier, NotifyLevel, TracingNotifier};
