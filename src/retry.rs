//! Bounded retry with exponential backoff and jitter.
//!
//! Third-party endpoints rate-limit and time out; transient failures are
//! retried a small fixed number of times with growing delays, everything
//! else is returned to the caller immediately.

use rand::Rng;
use std::fmt::Display;
use std::thread;
use std::time::Duration;
use tracing::warn;

/// Classifies an error as worth retrying or not.
pub trait Transient {
    fn is_transient(&self) -> bool;

    /// Server-requested minimum delay, when the response carried one.
    fn retry_after(&self) -> Option<Duration> {
        None
    }
}

/// Retry schedule: attempt n (1-based) sleeps `base_delay * 2^(n-1)` plus
/// uniform jitter, or the server-requested delay when that is larger.
#[derive(Debug, Clone)]
pub struct BackoffPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_jitter: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay: Duration::from_secs(1),
            max_jitter: Duration::from_millis(500),
        }
    }
}

impl BackoffPolicy {
    fn delay_before_retry(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        let exponential = self
            .base_delay
            .saturating_mul(1u32 << (attempt.saturating_sub(1)).min(16));
        let floor = match retry_after {
            Some(requested) if requested > exponential => requested,
            _ => exponential,
        };
        let jitter_ms = self.max_jitter.as_millis() as u64;
        if jitter_ms == 0 {
            floor
        } else {
            floor + Duration::from_millis(rand::thread_rng().gen_range(0..=jitter_ms))
        }
    }
}

/// Run `operation`, retrying transient failures per `policy`.
///
/// `what` names the operation in log lines. The operation runs at most
/// `policy.max_attempts` times; a non-transient error or the last attempt
/// returns the error as-is.
pub fn with_backoff<T, E>(
    policy: &BackoffPolicy,
    what: &str,
    mut operation: impl FnMut() -> Result<T, E>,
) -> Result<T, E>
where
    E: Transient + Display,
{
    let mut attempt = 0u32;
    loop {
        match operation() {
            Ok(value) => return Ok(value),
            Err(err) => {
                attempt += 1;
                if attempt >= policy.max_attempts || !err.is_transient() {
                    return Err(err);
                }
                let delay = policy.delay_before_retry(attempt, err.retry_after());
                warn!(
                    operation = what,
                    attempt,
                    max_attempts = policy.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "Transient failure, backing off"
                );
                thread::sleep(delay);
            }
        }
    }
}
