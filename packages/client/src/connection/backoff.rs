use std::time::Duration;

use rand::Rng;

use crate::config::BackoffConfig;

/// Exponential reconnection delay with jitter.
#[derive(Debug, Clone)]
pub struct Backoff {
    config: BackoffConfig,
}

impl Backoff {
    pub fn new(config: BackoffConfig) -> Self {
        Self { config }
    }

    /// `initial * multiplier^attempt`, capped at `max`
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let max = self.config.max.as_secs_f64();
        let multiplier = self.config.multiplier.max(1.0);
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let delay = self.config.initial.as_secs_f64() * multiplier.powi(exponent);
        if delay.is_finite() {
            Duration::from_secs_f64(delay.clamp(0.0, max))
        } else {
            self.config.max
        }
    }

    /// [`base_delay`](Self::base_delay) spread by `±jitter`, never above `max`
    pub fn delay(&self, attempt: u32) -> Duration {
        let base = self.base_delay(attempt);
        let jitter = self.config.jitter;
        if !jitter.is_finite() || jitter <= 0.0 {
            return base;
        }
        let jitter = jitter.min(1.0);
        let factor = 1.0 + rand::thread_rng().gen_range(-jitter..=jitter);
        Duration::from_secs_f64(base.as_secs_f64() * factor).min(self.config.max)
    }
}
