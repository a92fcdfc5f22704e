//! Consumers built on top of the hook.
//!
//! - `LiveFeed`: rolling log/alert buffers and statistics from the security
//!   feed topics, plus user notifications for alerts and system messages.

pub mod live_feed;

pub use live_feed::{FeedSnapshot, LiveFeed, ALERT_HISTORY, LOG_HISTORY};
