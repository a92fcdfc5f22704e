use std::time::Duration;

use crate::config::ReconnectSection;

/// Exponential reconnect schedule.
///
/// Attempt `n` (1-based) waits `base * growth^(n-1)`; attempts beyond
/// `max_attempts` get no delay at all, which means "give up".
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Backoff {
    base: Duration,
    growth: f64,
    max_attempts: u32,
}

impl Backoff {
    pub fn new(base: Duration, growth: f64, max_attempts: u32) -> Self {
        Self {
            base,
            growth,
            max_attempts,
        }
    }

    pub fn from_config(cfg: &ReconnectSection) -> Self {
        Self::new(
            Duration::from_millis(cfg.base_interval_ms),
            cfg.growth_factor,
            cfg.max_attempts,
        )
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn delay_for(&self, attempt: u32) -> Option<Duration> {
        if attempt == 0 || attempt > self.max_attempts {
            return None;
        }
        let exp = i32::try_from(attempt - 1).unwrap_or(i32::MAX);
        let ms = self.base.as_millis() as f64 * self.growth.powi(exp);
        Some(Duration::from_millis(ms.round() as u64))
    }
}
