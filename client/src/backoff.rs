//! Reconnect delay schedule.
//!
//! Each scheduled wait uses the current delay; the delay then grows by the
//! multiplier up to the cap. A successful handshake resets it to the base.

use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct Backoff {
    base: Duration,
    max: Duration,
    multiplier: f64,
    current: Duration,
}

impl Backoff {
    /// `multiplier` below 1.0 is treated as 1.0 and `max` never drops below
    /// `base`.
    #[must_use]
    pub fn new(base: Duration, max: Duration, multiplier: f64) -> Self {
        let multiplier = if multiplier.is_finite() { multiplier.max(1.0) } else { 1.0 };
        Self { base, max: max.max(base), multiplier, current: base }
    }

    /// Delay the next wait would use.
    #[must_use]
    pub fn current(&self) -> Duration {
        self.current
    }

    /// Take the delay for the wait being scheduled and grow the next one.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = delay.mul_f64(self.multiplier).min(self.max);
        delay
    }

    pub fn reset(&mut self) {
        self.current = self.base;
    }
}

#[cfg(test)]
#[path = "backoff_test.rs"]
mod tests;
