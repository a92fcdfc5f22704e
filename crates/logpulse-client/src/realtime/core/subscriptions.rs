use std::collections::HashMap;

use logpulse_core::protocol::stomp::StompFrame;

/// Topic subscriptions of one STOMP client.
///
/// - fixed topics come from config and are (re)subscribed on every session open
/// - dynamic topics are added/removed at runtime and survive reconnects too
/// - `bound` maps the live subscription ids of the current session to topics
///
/// Subscription ids are never reused, so a late MESSAGE for a dropped id can
/// not be misrouted.
#[derive(Debug, Clone, Default)]
pub struct SubscriptionSet {
    fixed: Vec<String>,
    dynamic: Vec<String>,
    bound: HashMap<String, String>,
    next_id: u64,
}

impl SubscriptionSet {
    pub fn new(fixed: Vec<String>) -> Self {
        Self {
            fixed,
            ..Self::default()
        }
    }

    /// Bind every topic under fresh ids; returns the SUBSCRIBE frames to send.
    pub fn establish(&mut self) -> Vec<StompFrame> {
        self.bound.clear();
        let topics: Vec<String> = self.topics().cloned().collect();
        topics.iter().map(|t| self.bind(t)).collect()
    }

    /// Add a dynamic topic. Returns a SUBSCRIBE frame when `bind_now` and the
    /// topic was not already known.
    pub fn add(&mut self, topic: &str, bind_now: bool) -> Option<StompFrame> {
        if self.contains(topic) {
            return None;
        }
        self.dynamic.push(topic.to_string());
        bind_now.then(|| self.bind(topic))
    }

    /// Remove a dynamic topic. Returns an UNSUBSCRIBE frame when it was bound.
    /// Fixed and unknown topics are left alone.
    pub fn remove(&mut self, topic: &str) -> Option<StompFrame> {
        let pos = self.dynamic.iter().position(|t| t == topic)?;
        self.dynamic.remove(pos);
        let id = self
            .bound
            .iter()
            .find(|(_, t)| t.as_str() == topic)
            .map(|(id, _)| id.clone())?;
        self.bound.remove(&id);
        Some(StompFrame::unsubscribe(&id))
    }

    /// Topic for a live subscription id.
    pub fn resolve(&self, subscription_id: &str) -> Option<&str> {
        self.bound.get(subscription_id).map(String::as_str)
    }

    /// Forget the ids of a closed session; topics are kept.
    pub fn clear_bindings(&mut self) {
        self.bound.clear();
    }

    pub fn contains(&self, topic: &str) -> bool {
        self.topics().any(|t| t == topic)
    }

    pub fn is_fixed(&self, topic: &str) -> bool {
        self.fixed.iter().any(|t| t == topic)
    }

    pub fn topics(&self) -> impl Iterator<Item = &String> {
        self.fixed.iter().chain(self.dynamic.iter())
    }

    pub fn bound_count(&self) -> usize {
        self.bound.len()
    }

    fn bind(&mut self, topic: &str) -> StompFrame {
        let id = format!("sub-{}", self.next_id);
        self.next_id += 1;
        self.bound.insert(id.clone(), topic.to_string());
        StompFrame::subscribe(&id, topic)
    }
}
