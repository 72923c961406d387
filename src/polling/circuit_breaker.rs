//! Circuit breaker guarding the ticket backend.
//!
//! After enough consecutive failures the poll loop stops hitting the backend
//! for a cooldown period, then lets a single trial request through.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BreakerState {
    /// Requests flow normally
    Closed,
    /// Requests are skipped until the cooldown elapses
    Open,
    /// One trial request is allowed
    HalfOpen,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BreakerSettings {
    /// Consecutive failures that open the breaker. Zero disables the breaker.
    pub failure_threshold: u32,
    /// How long the breaker stays open before probing.
    pub cooldown: Duration,
}

impl Default for BreakerSettings {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            cooldown: Duration::from_secs(60),
        }
    }
}

#[derive(Debug)]
pub struct CircuitBreaker {
    settings: BreakerSettings,
    state: BreakerState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
}

impl CircuitBreaker {
    pub fn new(settings: BreakerSettings) -> Self {
        Self {
            settings,
            state: BreakerState::Closed,
            consecutive_failures: 0,
            opened_at: None,
        }
    }

    pub fn state(&self) -> BreakerState {
        self.state
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn allow_request(&mut self) -> bool {
        self.allow_request_at(Instant::now())
    }

    /// Whether a request may be sent at `now`. An open breaker whose cooldown
    /// has elapsed moves to half-open and allows the trial request.
    pub fn allow_request_at(&mut self, now: Instant) -> bool {
        match self.state {
            BreakerState::Closed | BreakerState::HalfOpen => true,
            BreakerState::Open => {
                let elapsed = self
                    .opened_at
                    .map(|opened_at| now.saturating_duration_since(opened_at))
                    .unwrap_or(self.settings.cooldown);
                if elapsed >= self.settings.cooldown {
                    info!("Circuit breaker half-open, probing ticket backend");
                    self.state = BreakerState::HalfOpen;
                    true
                } else {
                    false
                }
            }
        }
    }

    pub fn record_success(&mut self) {
        if self.state != BreakerState::Closed {
            info!("Circuit breaker closed after successful trial request");
        }
        self.state = BreakerState::Closed;
        self.consecutive_failures = 0;
        self.opened_at = None;
    }

    pub fn record_failure(&mut self) {
        self.record_failure_at(Instant::now());
    }

    pub fn record_failure_at(&mut self, now: Instant) {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);

        if self.settings.failure_threshold == 0 {
            return;
        }

        match self.state {
            BreakerState::HalfOpen => {
                warn!("Trial request failed, circuit breaker open again");
                self.open(now);
            }
            BreakerState::Closed
                if self.consecutive_failures >= self.settings.failure_threshold =>
            {
                warn!(
                    "Circuit breaker open after {} consecutive failures, pausing for {:?}",
                    self.consecutive_failures, self.settings.cooldown
                );
                self.open(now);
            }
            _ => {}
        }
    }

    fn open(&mut self, now: Instant) {
        self.state = BreakerState::Open;
        self.opened_at = Some(now);
    }

    /// Time left before an open breaker lets a trial request through.
    pub fn remaining_cooldown(&self, now: Instant) -> Option<Duration> {
        match (self.state, self.opened_at) {
            (BreakerState::Open, Some(opened_at)) => Some(
                self.settings
                    .cooldown
                    .saturating_sub(now.saturating_duration_since(opened_at)),
            ),
            _ => None,
        }
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(BreakerSettings::default())
    }
}
