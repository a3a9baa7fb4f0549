//! Bounded retries with exponential backoff.
//!
//! [`RetryConfig`] computes the backoff schedule; [`RetryController`] drives a
//! caller-supplied async operation through it and publishes its progress as
//! [`RetryState`] for UI binding.

mod controller;

pub use controller::{RetryController, RetryState};

use std::time::Duration;

/// Configuration for retry behavior with exponential backoff.
#[derive(Clone, Debug, PartialEq)]
pub struct RetryConfig {
    /// Retries after the first attempt; the operation runs at most
    /// `max_retries + 1` times.
    pub max_retries: u32,
    /// Delay after the first failed attempt.
    pub initial_delay: Duration,
    /// Growth factor applied per attempt.
    pub backoff_multiplier: f64,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(1000),
            backoff_multiplier: 2.0,
            max_delay: Duration::from_millis(10_000),
        }
    }
}

impl RetryConfig {
    /// Creates a new retry configuration.
    pub fn new(
        max_retries: u32,
        initial_delay: Duration,
        backoff_multiplier: f64,
        max_delay: Duration,
    ) -> Self {
        Self {
            max_retries,
            initial_delay,
            backoff_multiplier,
            max_delay,
        }
    }

    /// Sets the number of retries.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Sets the delay after the first failure.
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Sets the backoff multiplier.
    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Sets the delay cap.
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Total number of times the operation may run in one retry run.
    pub fn total_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Delay between attempt `attempt` (0-indexed) and the next one.
    ///
    /// Computed as `initial_delay * backoff_multiplier^attempt`, capped at
    /// `max_delay`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(i32::MAX as u32) as i32;
        let scaled_nanos =
            self.initial_delay.as_nanos() as f64 * self.backoff_multiplier.powi(exponent);

        if scaled_nanos.is_nan() || scaled_nanos <= 0.0 {
            return Duration::ZERO;
        }
        if !scaled_nanos.is_finite() || scaled_nanos >= self.max_delay.as_nanos() as f64 {
            return self.max_delay;
        }
        Duration::from_nanos(scaled_nanos.round() as u64)
    }

    /// The full list of gaps a permanently failing operation goes through.
    pub fn schedule(&self) -> Vec<Duration> {
        (0..self.max_retries).map(|n| self.delay_for(n)).collect()
    }
}
