//! Retry policy for remote calls
//!
//! Throttled calls wait a random 1-6 seconds; other retryable failures wait a
//! fixed 2 seconds. Everything else is terminal. The number of attempts is
//! unbounded unless `max_attempts` is set.

use crate::aws::error::RemoteError;
use futures::future::BoxFuture;
use futures::FutureExt;
use rand::Rng;
use std::ops::Range;
use std::time::Duration;

/// Error codes that mean "slow down"
pub const THROTTLING_CODES: &[&str] = &[
    "Throttling",
    "ThrottlingException",
    "TooManyRequestsException",
    "RequestLimitExceeded",
];

/// How a failed call should be handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Throttling,
    Retryable,
    Terminal,
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts allowed per request; `None` retries forever
    pub max_attempts: Option<u32>,
    pub throttling_codes: Vec<String>,
    /// Uniform range for throttling backoff, in milliseconds
    pub throttle_delay_ms: Range<u64>,
    pub retry_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: None,
            throttling_codes: THROTTLING_CODES.iter().map(|c| c.to_string()).collect(),
            throttle_delay_ms: 1000..6000,
            retry_delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_attempts(mut self, max_attempts: Option<u32>) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn classify(&self, err: &RemoteError) -> ErrorClass {
        let throttled = err
            .code()
            .map(|code| self.throttling_codes.iter().any(|c| c == code))
            .unwrap_or(false);

        if throttled {
            ErrorClass::Throttling
        } else if err.retryable {
            ErrorClass::Retryable
        } else {
            ErrorClass::Terminal
        }
    }

    /// How long to wait before the next attempt, or `None` to give up
    pub fn delay_for(&self, class: ErrorClass) -> Option<Duration> {
        match class {
            ErrorClass::Throttling => {
                let range = if self.throttle_delay_ms.is_empty() {
                    self.throttle_delay_ms.start..self.throttle_delay_ms.start + 1
                } else {
                    self.throttle_delay_ms.clone()
                };
                Some(Duration::from_millis(rand::rng().random_range(range)))
            }
            ErrorClass::Retryable => Some(self.retry_delay),
            ErrorClass::Terminal => None,
        }
    }

    /// Whether another attempt is allowed after `attempts` have been made
    pub fn allows_attempt(&self, attempts: u32) -> bool {
        self.max_attempts.map(|max| attempts < max).unwrap_or(true)
    }
}

/// Source of backoff delays; swapped out in tests
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()>;
}

/// Real time, via tokio
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()> {
        tokio::time::sleep(duration).boxed()
    }
}
