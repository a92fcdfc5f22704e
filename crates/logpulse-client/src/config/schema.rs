use std::time::Duration;

use serde::Deserialize;

use logpulse_core::error::{PulseError, Result};
use logpulse_core::protocol::topic::{DEFAULT_PUBLISH_DESTINATION, DEFAULT_TOPICS};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    pub version: u32,

    pub client: ClientSection,

    #[serde(default)]
    pub reconnect: ReconnectSection,

    #[serde(default)]
    pub stomp: StompSection,
}

impl ClientConfig {
    /// Minimal valid config for `url`, defaults everywhere else.
    pub fn for_url(url: impl Into<String>, wire: WireMode) -> Self {
        Self {
            version: 1,
            client: ClientSection {
                url: url.into(),
                wire,
                connect_timeout_ms: default_connect_timeout_ms(),
                heartbeat_interval_ms: default_heartbeat_interval_ms(),
            },
            reconnect: ReconnectSection::default(),
            stomp: StompSection::default(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(PulseError::UnsupportedVersion);
        }

        self.client.validate()?;
        self.reconnect.validate()?;
        if self.client.wire == WireMode::Stomp {
            self.stomp.validate()?;
        }

        Ok(())
    }
}

/// Framing spoken over the WebSocket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireMode {
    /// JSON envelopes as text frames.
    Plain,
    /// STOMP 1.2 frames with topic subscriptions.
    Stomp,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientSection {
    pub url: String,

    #[serde(default = "default_wire")]
    pub wire: WireMode,

    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Client heartbeat period on the plain wire; 0 disables.
    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,
}

impl ClientSection {
    pub fn validate(&self) -> Result<()> {
        if !(self.url.starts_with("ws://") || self.url.starts_with("wss://")) {
            return Err(PulseError::Config(
                "client.url must start with ws:// or wss://".into(),
            ));
        }
        if !(1000..=120000).contains(&self.connect_timeout_ms) {
            return Err(PulseError::Config(
                "client.connect_timeout_ms must be between 1000 and 120000".into(),
            ));
        }
        if self.heartbeat_interval_ms != 0 && !(1000..=600000).contains(&self.heartbeat_interval_ms) {
            return Err(PulseError::Config(
                "client.heartbeat_interval_ms must be 0 or between 1000 and 600000".into(),
            ));
        }
        Ok(())
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn heartbeat_interval(&self) -> Option<Duration> {
        (self.heartbeat_interval_ms > 0).then(|| Duration::from_millis(self.heartbeat_interval_ms))
    }
}

fn default_wire() -> WireMode {
    WireMode::Plain
}
fn default_connect_timeout_ms() -> u64 {
    10000
}
fn default_heartbeat_interval_ms() -> u64 {
    30000
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReconnectSection {
    #[serde(default = "default_base_interval_ms")]
    pub base_interval_ms: u64,

    #[serde(default = "default_growth_factor")]
    pub growth_factor: f64,

    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Pause between teardown and reconnect on a manual `reconnect()`.
    #[serde(default = "default_manual_delay_ms")]
    pub manual_delay_ms: u64,
}

impl Default for ReconnectSection {
    fn default() -> Self {
        Self {
            base_interval_ms: default_base_interval_ms(),
            growth_factor: default_growth_factor(),
            max_attempts: default_max_attempts(),
            manual_delay_ms: default_manual_delay_ms(),
        }
    }
}

impl ReconnectSection {
    pub fn validate(&self) -> Result<()> {
        if !(100..=600000).contains(&self.base_interval_ms) {
            return Err(PulseError::Config(
                "reconnect.base_interval_ms must be between 100 and 600000".into(),
            ));
        }
        if !(self.growth_factor > 1.0 && self.growth_factor <= 10.0) {
            return Err(PulseError::Config(
                "reconnect.growth_factor must be greater than 1.0 and at most 10.0".into(),
            ));
        }
        if !(1..=100).contains(&self.max_attempts) {
            return Err(PulseError::Config(
                "reconnect.max_attempts must be between 1 and 100".into(),
            ));
        }
        if self.manual_delay_ms > 10000 {
            return Err(PulseError::Config(
                "reconnect.manual_delay_ms must be at most 10000".into(),
            ));
        }
        Ok(())
    }
}

fn default_base_interval_ms() -> u64 {
    3000
}
fn default_growth_factor() -> f64 {
    1.5
}
fn default_max_attempts() -> u32 {
    5
}
fn default_manual_delay_ms() -> u64 {
    100
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StompSection {
    /// `host` header of CONNECT; defaults to the URL authority.
    #[serde(default)]
    pub host: Option<String>,

    #[serde(default = "default_topics")]
    pub topics: Vec<String>,

    #[serde(default = "default_publish_destination")]
    pub publish_destination: String,

    #[serde(default = "default_stomp_heartbeat_ms")]
    pub heartbeat_outgoing_ms: u64,

    #[serde(default = "default_stomp_heartbeat_ms")]
    pub heartbeat_incoming_ms: u64,
}

impl Default for StompSection {
    fn default() -> Self {
        Self {
            host: None,
            topics: default_topics(),
            publish_destination: default_publish_destination(),
            heartbeat_outgoing_ms: default_stomp_heartbeat_ms(),
            heartbeat_incoming_ms: default_stomp_heartbeat_ms(),
        }
    }
}

impl StompSection {
    pub fn validate(&self) -> Result<()> {
        if self.topics.is_empty() {
            return Err(PulseError::Config("stomp.topics must not be empty".into()));
        }
        if let Some(bad) = self.topics.iter().find(|t| !t.starts_with('/')) {
            return Err(PulseError::Config(format!(
                "stomp.topics entry must start with '/': {bad}"
            )));
        }
        if !self.publish_destination.starts_with('/') {
            return Err(PulseError::Config(
                "stomp.publish_destination must start with '/'".into(),
            ));
        }
        Ok(())
    }

    /// `host` header value: configured host, else the URL authority.
    pub fn host_for(&self, url: &str) -> String {
        if let Some(h) = &self.host {
            return h.clone();
        }
        let rest = url.split_once("://").map(|(_, r)| r).unwrap_or(url);
        rest.split('/').next().unwrap_or(rest).to_string()
    }
}

fn default_topics() -> Vec<String> {
    DEFAULT_TOPICS.iter().map(|t| t.to_string()).collect()
}
fn default_publish_destination() -> String {
    DEFAULT_PUBLISH_DESTINATION.to_string()
}
fn default_stomp_heartbeat_ms() -> u64 {
    10000
}
