//! Retry with exponential backoff
//!
//! One primitive shared by every action kind: up to `max_attempts` tries,
//! sleeping `base_delay * 2^(attempt - 1)` (capped) after each retryable
//! failure. Non-retryable failures return immediately. Cancellation is
//! checked before every retry and during the backoff sleep.

use std::thread;
use std::time::{Duration, Instant};

use crate::cancel::CancelToken;

const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(2);
const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(60);
const SLEEP_SLICE: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
        }
    }
}

impl RetryPolicy {
    /// Delay after the failed attempt number `attempt` (1-based)
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.base_delay
            .saturating_mul(1_u32 << exponent)
            .min(self.max_delay)
    }
}

/// Waits between attempts
pub trait Sleeper: Sync {
    /// Sleep for `duration`; returns false if cancelled while waiting
    fn sleep(&self, duration: Duration, cancel: &CancelToken) -> bool;
}

/// Sleeps on the current thread in short slices so cancellation is noticed
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration, cancel: &CancelToken) -> bool {
        let deadline = Instant::now() + duration;
        loop {
            if cancel.is_cancelled() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            thread::sleep(SLEEP_SLICE.min(deadline - now));
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RetryError<E> {
    /// Every attempt failed with a retryable error
    Exhausted { attempts: u32, last: E },
    /// A non-retryable error stopped the loop
    Fatal { attempts: u32, error: E },
    /// Cancelled before the next attempt
    Cancelled { attempts: u32, last: Option<E> },
}

/// Run `op` under `policy`, returning its value and the attempts used
///
/// `op` receives the 1-based attempt number. `on_retry` is told about each
/// failure that will be retried and the delay before the next attempt.
pub fn retry<T, E, Op, Retryable, OnRetry>(
    policy: &RetryPolicy,
    cancel: &CancelToken,
    sleeper: &dyn Sleeper,
    mut op: Op,
    is_retryable: Retryable,
    mut on_retry: OnRetry,
) -> Result<(T, u32), RetryError<E>>
where
    Op: FnMut(u32) -> Result<T, E>,
    Retryable: Fn(&E) -> bool,
    OnRetry: FnMut(u32, Duration, &E),
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        if cancel.is_cancelled() {
            return Err(RetryError::Cancelled {
                attempts: attempt - 1,
                last: None,
            });
        }

        let error = match op(attempt) {
            Ok(value) => return Ok((value, attempt)),
            Err(error) => error,
        };

        if !is_retryable(&error) {
            return Err(RetryError::Fatal {
                attempts: attempt,
                error,
            });
        }
        if attempt >= max_attempts {
            return Err(RetryError::Exhausted {
                attempts: attempt,
                last: error,
            });
        }

        let delay = policy.delay_after(attempt);
        on_retry(attempt, delay, &error);
        if cancel.is_cancelled() || !sleeper.sleep(delay, cancel) {
            return Err(RetryError::Cancelled {
                attempts: attempt,
                last: Some(error),
            });
        }
        attempt += 1;
    }
}
