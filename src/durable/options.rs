//! Timeouts and retry policy for durable jobs.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How a failed or timed-out task attempt is retried.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    pub initial_interval: Duration,
    pub backoff_coefficient: f64,
    pub max_interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_interval: Duration::from_millis(100),
            backoff_coefficient: 2.0,
            max_interval: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Delay before the attempt following `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(32) as i32;
        let scaled = self.initial_interval.as_secs_f64() * self.backoff_coefficient.powi(exponent);
        if !scaled.is_finite() || scaled >= self.max_interval.as_secs_f64() {
            return self.max_interval;
        }
        Duration::from_secs_f64(scaled.max(0.0))
    }
}

/// Options applied to every task and wait of a durable job.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DurableOptions {
    /// Start-to-close timeout of a single task attempt.
    pub task_timeout: Duration,
    /// Upper bound on the wait between ticks when no signal arrives.
    pub tick_wait: Duration,
    pub retry: RetryPolicy,
}

impl Default for DurableOptions {
    fn default() -> Self {
        Self {
            task_timeout: Duration::from_secs(10),
            tick_wait: Duration::from_secs(1),
            retry: RetryPolicy::default(),
        }
    }
}

impl DurableOptions {
    pub fn builder() -> DurableOptionsBuilder {
        DurableOptionsBuilder::new()
    }
}

/// Fluent builder for [`DurableOptions`].
///
/// # Example
///
/// ```rust
/// use durable_fsm::durable::DurableOptions;
/// use std::time::Duration;
///
/// let options = DurableOptions::builder()
///     .task_timeout(Duration::from_secs(30))
///     .tick_wait(Duration::from_millis(250))
///     .max_attempts(5)
///     .build();
///
/// assert_eq!(options.retry.max_attempts, 5);
/// ```
#[derive(Clone, Debug, Default)]
pub struct DurableOptionsBuilder {
    options: DurableOptions,
}

impl DurableOptionsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn task_timeout(mut self, timeout: Duration) -> Self {
        self.options.task_timeout = timeout;
        self
    }

    pub fn tick_wait(mut self, wait: Duration) -> Self {
        self.options.tick_wait = wait;
        self
    }

    /// Set maximum attempts per task. Zero is treated as one.
    pub fn max_attempts(mut self, n: u32) -> Self {
        self.options.retry.max_attempts = n.max(1);
        self
    }

    pub fn initial_interval(mut self, interval: Duration) -> Self {
        self.options.retry.initial_interval = interval;
        self
    }

    pub fn backoff_coefficient(mut self, coefficient: f64) -> Self {
        self.options.retry.backoff_coefficient = coefficient;
        self
    }

    pub fn max_interval(mut self, interval: Duration) -> Self {
        self.options.retry.max_interval = interval;
        self
    }

    pub fn retry(mut self, policy: RetryPolicy) -> Self {
        self.options.retry = policy;
        self
    }

    pub fn build(self) -> DurableOptions {
        self.options
    }
}
