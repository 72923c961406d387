//! Backoff between failed poll cycles.
//!
//! Implements bounded exponential backoff with random jitter.

use rand::Rng;
use std::time::Duration;

/// Retry policy applied to the poll loop after consecutive failures.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// When false, the loop always waits exactly one poll interval.
    pub enabled: bool,
    /// Backoff after the first failure.
    pub initial_backoff: Duration,
    /// Cap for exponential growth.
    pub max_backoff: Duration,
    /// Multiplier applied to backoff after each further failure.
    pub backoff_multiplier: f64,
    /// Fraction of the delay added or removed at random, in `[0, 1)`.
    pub jitter_ratio: f64,
}

impl RetryPolicy {
    /// Policy that never backs off.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    /// Backoff without jitter after `consecutive_failures` failures.
    ///
    /// `initial_backoff * multiplier^(failures - 1)`, capped at `max_backoff`.
    /// Zero when there were no failures.
    pub fn backoff(&self, consecutive_failures: u32) -> Duration {
        if consecutive_failures == 0 {
            return Duration::ZERO;
        }
        let exponent = (consecutive_failures - 1).min(i32::MAX as u32) as i32;
        let backoff =
            self.initial_backoff.as_secs_f64() * self.backoff_multiplier.powi(exponent);
        let capped = backoff.min(self.max_backoff.as_secs_f64());
        if capped.is_finite() && capped > 0.0 {
            Duration::from_secs_f64(capped)
        } else {
            Duration::ZERO
        }
    }

    /// Delay before the next cycle, never shorter than `interval` before jitter.
    pub fn next_delay(&self, interval: Duration, consecutive_failures: u32) -> Duration {
        if !self.enabled || consecutive_failures == 0 {
            return interval;
        }
        let base = interval.max(self.backoff(consecutive_failures));
        self.apply_jitter(base)
    }

    /// Range `next_delay` picks from for the given failure count.
    pub fn delay_bounds(&self, interval: Duration, consecutive_failures: u32) -> (Duration, Duration) {
        if !self.enabled || consecutive_failures == 0 {
            return (interval, interval);
        }
        let base = interval.max(self.backoff(consecutive_failures));
        let ratio = self.clamped_jitter();
        (base.mul_f64(1.0 - ratio), base.mul_f64(1.0 + ratio))
    }

    fn clamped_jitter(&self) -> f64 {
        if self.jitter_ratio.is_finite() {
            self.jitter_ratio.clamp(0.0, 0.99)
        } else {
            0.0
        }
    }

    fn apply_jitter(&self, base: Duration) -> Duration {
        let ratio = self.clamped_jitter();
        if ratio == 0.0 {
            return base;
        }
        let factor = rand::rng().random_range((1.0 - ratio)..=(1.0 + ratio));
        base.mul_f64(factor)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(300), // 5 minutes
            backoff_multiplier: 2.0,
            jitter_ratio: 0.2,
        }
    }
}
