//! Bounded retry with exponential backoff and jitter

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

use crate::clock::Clock;
use crate::error::GatewayError;

/// Jitter bounds applied multiplicatively to each backoff delay
const JITTER_MIN: f64 = 0.8;
const JITTER_MAX: f64 = 1.2;

/// Errors that know whether another attempt could succeed
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

impl Retryable for GatewayError {
    fn is_retryable(&self) -> bool {
        GatewayError::is_retryable(self)
    }
}

/// Retry budget and backoff shape
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts including the first one (>= 1)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_base_backoff_sec")]
    pub base_backoff_sec: f64,
    #[serde(default = "default_max_backoff_sec")]
    pub max_backoff_sec: f64,
}

fn default_max_attempts() -> u32 {
    3
}
fn default_base_backoff_sec() -> f64 {
    0.5
}
fn default_max_backoff_sec() -> f64 {
    5.0
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_backoff_sec: default_base_backoff_sec(),
            max_backoff_sec: default_max_backoff_sec(),
        }
    }
}

impl RetryPolicy {
    /// Un-jittered delay after the given failed attempt (1-indexed)
    ///
    /// `min(max_backoff, base_backoff * 2^(attempt-1))`
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(62) as i32;
        let secs = (self.base_backoff_sec * 2f64.powi(exponent)).min(self.max_backoff_sec);
        saturating_secs(secs)
    }

    /// Backoff delay scaled by a uniform jitter factor in [0.8, 1.2]
    pub fn jittered_delay(&self, attempt: u32) -> Duration {
        let factor = JITTER_MIN + fastrand::f64() * (JITTER_MAX - JITTER_MIN);
        saturating_secs(self.backoff_delay(attempt).as_secs_f64() * factor)
    }

    /// Run `call` until it succeeds, fails fatally, or the budget is spent
    ///
    /// `call` receives the 1-indexed attempt number. The last error is returned
    /// unchanged when attempts run out.
    pub fn run<T, E, F>(&self, clock: &dyn Clock, label: &str, mut call: F) -> Result<T, E>
    where
        E: Retryable + std::fmt::Display,
        F: FnMut(u32) -> Result<T, E>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match call(attempt) {
                Ok(value) => return Ok(value),
                Err(err) if !err.is_retryable() => return Err(err),
                Err(err) if attempt >= max_attempts => {
                    warn!(%label, attempts = attempt, error = %err, "giving up after retries");
                    return Err(err);
                }
                Err(err) => {
                    let delay = self.jittered_delay(attempt);
                    warn!(
                        %label,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "request failed, retrying"
                    );
                    clock.sleep(delay);
                    attempt += 1;
                }
            }
        }
    }
}

/// `Duration` from seconds; negative or NaN is zero, overflow is `Duration::MAX`
fn saturating_secs(secs: f64) -> Duration {
    if secs.is_nan() || secs <= 0.0 {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
}
