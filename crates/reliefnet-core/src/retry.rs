//! Retry executor with exponential backoff and error classification.
//!
//! Operations that talk to flaky collaborators (the broker, the geodata
//! directory, the mail transport) run through [`run_with_backoff`]. Errors
//! classify themselves as transient or permanent via [`ClassifyError`];
//! permanent errors fail immediately, transient ones are retried with a
//! capped, optionally jittered exponential delay.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// How the retry executor should treat a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Worth another attempt after a backoff sleep.
    Transient,
    /// Retrying cannot help; fail without further attempts.
    Permanent,
}

/// Classification hook for errors that flow through [`run_with_backoff`].
pub trait ClassifyError {
    /// Returns how the retry executor should treat this error.
    fn class(&self) -> ErrorClass;

    /// True when the error is worth retrying.
    fn is_transient(&self) -> bool {
        self.class() == ErrorClass::Transient
    }
}

/// Exponential backoff policy.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first. Treated as 1 if 0.
    pub max_attempts: u32,
    /// Sleep before the second attempt.
    pub initial_delay: Duration,
    /// Upper bound on any single backoff sleep.
    pub max_delay: Duration,
    /// Multiplier applied to the delay after each failed attempt.
    pub backoff_factor: f64,
    /// Randomize each sleep uniformly within ±25% of the nominal delay.
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(30),
            backoff_factor: 2.0,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// Returns the un-jittered sleep taken after the `attempt`th failure
    /// (1-based): `initial_delay * backoff_factor^(attempt - 1)`, capped at
    /// `max_delay`.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let mut delay = self.initial_delay;
        for _ in 1..attempt {
            delay = self.next_delay(delay);
        }
        delay.min(self.max_delay)
    }

    /// Applies the ±25% jitter window to `delay` when jitter is enabled.
    #[must_use]
    pub fn jittered(&self, delay: Duration) -> Duration {
        if !self.jitter {
            return delay;
        }
        let factor = rand::rng().random_range(0.75..=1.25);
        delay.mul_f64(factor)
    }

    fn next_delay(&self, current: Duration) -> Duration {
        let scaled = current.as_secs_f64() * self.backoff_factor;
        if scaled >= self.max_delay.as_secs_f64() {
            self.max_delay
        } else {
            Duration::from_secs_f64(scaled)
        }
    }
}

/// Outcome of a retry run that did not succeed.
#[derive(Debug, Error)]
pub enum RetryError<E> {
    /// The token was cancelled before an attempt or during a backoff sleep.
    #[error("retry cancelled")]
    Cancelled,

    /// The operation failed with an error classified as permanent.
    #[error("non-retryable error after {attempts} attempt(s)")]
    Permanent {
        /// Attempts made before giving up.
        attempts: u32,
        /// The permanent failure.
        #[source]
        source: E,
    },

    /// Every allowed attempt failed with a transient error.
    #[error("max retry attempts ({attempts}) exceeded")]
    Exhausted {
        /// Attempts made, equal to the policy's `max_attempts`.
        attempts: u32,
        /// The last transient failure.
        #[source]
        source: E,
    },
}

/// Runs `op` under `policy`, sleeping between transient failures.
///
/// Cancelling `token` before an attempt or during a backoff sleep aborts the
/// run with [`RetryError::Cancelled`]. A running attempt is never interrupted
/// here; callers that need mid-attempt cancellation race the attempt against
/// the token themselves.
///
/// # Errors
///
/// Returns [`RetryError::Permanent`] when `op` fails with a permanent error,
/// [`RetryError::Exhausted`] when all attempts fail transiently, and
/// [`RetryError::Cancelled`] on cancellation.
pub async fn run_with_backoff<T, E, F, Fut>(
    token: &CancellationToken,
    policy: &RetryPolicy,
    mut op: F,
) -> Result<T, RetryError<E>>
where
    E: ClassifyError + std::fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut delay = policy.initial_delay;
    let mut attempt = 1;

    loop {
        if token.is_cancelled() {
            return Err(RetryError::Cancelled);
        }

        match op().await {
            Ok(value) => return Ok(value),
            Err(source) if source.class() == ErrorClass::Permanent => {
                return Err(RetryError::Permanent {
                    attempts: attempt,
                    source,
                });
            }
            Err(source) => {
                if attempt >= max_attempts {
                    return Err(RetryError::Exhausted {
                        attempts: attempt,
                        source,
                    });
                }

                let sleep_for = policy.jittered(delay);
                tracing::debug!(attempt, sleep = ?sleep_for, error = %source, "attempt failed; backing off");

                tokio::select! {
                    () = token.cancelled() => return Err(RetryError::Cancelled),
                    () = tokio::time::sleep(sleep_for) => {}
                }

                delay = policy.next_delay(delay);
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    #[derive(Debug, Error)]
    enum TestError {
        #[error("transient failure")]
        Transient,
        #[error("permanent failure")]
        Permanent,
    }

    impl ClassifyError for TestError {
        fn class(&self) -> ErrorClass {
            match self {
                Self::Transient => ErrorClass::Transient,
                Self::Permanent => ErrorClass::Permanent,
            }
        }
    }

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
            backoff_factor: 2.0,
            jitter: false,
        }
    }

    #[test]
    fn test_delay_doubles_and_caps_at_max() {
        let policy = RetryPolicy {
            max_attempts: 10,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
            backoff_factor: 2.0,
            jitter: false,
        };

        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_millis(400));
        assert_eq!(policy.delay_for_attempt(4), Duration::from_millis(800));
        // 100ms * 2^6 = 6.4s, past the 5s cap.
        assert_eq!(policy.delay_for_attempt(7), Duration::from_secs(5));
        assert_eq!(policy.delay_for_attempt(10), Duration::from_secs(5));
    }

    #[test]
    fn test_jitter_stays_within_quarter_of_nominal() {
        let policy = RetryPolicy::default();
        let nominal = Duration::from_millis(1000);

        for _ in 0..500 {
            let realized = policy.jittered(nominal);
            assert!(realized >= Duration::from_millis(750), "too short: {realized:?}");
            assert!(realized <= Duration::from_millis(1250), "too long: {realized:?}");
        }
    }

    #[test]
    fn test_jitter_disabled_returns_nominal_delay() {
        let policy = fast_policy(3);
        let nominal = Duration::from_millis(400);

        assert_eq!(policy.jittered(nominal), nominal);
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let token = CancellationToken::new();

        let result = run_with_backoff(&token, &fast_policy(5), || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(TestError::Transient)
                } else {
                    Ok(n)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_error_short_circuits_after_one_attempt() {
        let calls = AtomicU32::new(0);
        let token = CancellationToken::new();

        let result: Result<(), _> = run_with_backoff(&token, &fast_policy(5), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(TestError::Permanent) }
        })
        .await;

        match result.unwrap_err() {
            RetryError::Permanent { attempts, .. } => assert_eq!(attempts, 1),
            other => panic!("expected Permanent, got {other:?}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausts_all_attempts_on_transient_failures() {
        let calls = AtomicU32::new(0);
        let token = CancellationToken::new();

        let result: Result<(), _> = run_with_backoff(&token, &fast_policy(3), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(TestError::Transient) }
        })
        .await;

        match result.unwrap_err() {
            RetryError::Exhausted { attempts, source } => {
                assert_eq!(attempts, 3);
                assert!(matches!(source, TestError::Transient));
            }
            other => panic!("expected Exhausted, got {other:?}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_token_aborts_before_first_attempt() {
        let calls = AtomicU32::new(0);
        let token = CancellationToken::new();
        token.cancel();

        let result: Result<(), RetryError<TestError>> =
            run_with_backoff(&token, &fast_policy(3), || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(()) }
            })
            .await;

        assert!(matches!(result.unwrap_err(), RetryError::Cancelled));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_during_backoff_sleep_aborts_run() {
        let calls = AtomicU32::new(0);
        let token = CancellationToken::new();
        let op_token = token.clone();

        // The first attempt fails transiently and cancels the token, so the
        // executor must bail out of the backoff sleep instead of retrying.
        let result: Result<(), _> = run_with_backoff(&token, &fast_policy(5), || {
            calls.fetch_add(1, Ordering::SeqCst);
            op_token.cancel();
            async { Err(TestError::Transient) }
        })
        .await;

        assert!(matches!(result.unwrap_err(), RetryError::Cancelled));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_max_attempts_still_runs_once() {
        let calls = AtomicU32::new(0);
        let token = CancellationToken::new();

        let result = run_with_backoff(&token, &fast_policy(0), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, TestError>(7) }
        })
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
