//! Backoff Executor: bounded retry for quota/rate-limit failures.

use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::SheetsResult;

/// Fixed wait used for quota errors on bulk writes.
pub const QUOTA_RETRY_DELAY: Duration = Duration::from_secs(60);
pub const QUOTA_MAX_ATTEMPTS: u32 = 3;

/// Exponential schedule used for per-record calls.
pub const EXPONENTIAL_INITIAL_DELAY: Duration = Duration::from_millis(400);
pub const EXPONENTIAL_FACTOR: f64 = 1.7;
pub const EXPONENTIAL_MAX_ATTEMPTS: u32 = 6;

/// How long to wait between attempts, and how many attempts to make.
#[derive(Debug, Clone, PartialEq)]
pub enum RetryPolicy {
    /// Same delay after every failed attempt.
    Fixed { delay: Duration, max_attempts: u32 },
    /// `initial * factor^(n-1)` after the n-th failed attempt.
    Exponential {
        initial: Duration,
        factor: f64,
        max_attempts: u32,
    },
}

impl RetryPolicy {
    /// 60 s fixed wait, 3 attempts. Tuned for per-minute quota windows.
    pub fn quota() -> Self {
        RetryPolicy::Fixed {
            delay: QUOTA_RETRY_DELAY,
            max_attempts: QUOTA_MAX_ATTEMPTS,
        }
    }

    /// 0.4 s start, ×1.7 per attempt, 6 attempts.
    pub fn exponential() -> Self {
        RetryPolicy::Exponential {
            initial: EXPONENTIAL_INITIAL_DELAY,
            factor: EXPONENTIAL_FACTOR,
            max_attempts: EXPONENTIAL_MAX_ATTEMPTS,
        }
    }

    /// Single attempt, no retry.
    pub fn none() -> Self {
        RetryPolicy::Fixed {
            delay: Duration::ZERO,
            max_attempts: 1,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        let max = match self {
            RetryPolicy::Fixed { max_attempts, .. } => *max_attempts,
            RetryPolicy::Exponential { max_attempts, .. } => *max_attempts,
        };
        max.max(1)
    }

    /// Delay to wait after the `attempt`-th (1-based) failure.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        match self {
            RetryPolicy::Fixed { delay, .. } => *delay,
            RetryPolicy::Exponential {
                initial, factor, ..
            } => {
                let exponent = attempt.saturating_sub(1) as i32;
                initial.mul_f64(factor.powi(exponent))
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::exponential()
    }
}

/// Runs a remote operation under a [`RetryPolicy`].
///
/// Only transient errors are retried. Everything else is returned on the
/// first failure. When the attempt budget runs out the last error is
/// returned unchanged; nothing is swallowed here.
#[derive(Debug, Clone, Default)]
pub struct BackoffExecutor {
    policy: RetryPolicy,
}

impl BackoffExecutor {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub async fn execute<T, F, Fut>(&self, label: &str, mut op: F) -> SheetsResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = SheetsResult<T>>,
    {
        let max_attempts = self.policy.max_attempts();
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(op = label, attempt, "Succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(err) if err.is_transient() && attempt < max_attempts => {
                    let delay = self.policy.delay_after(attempt);
                    warn!(
                        op = label,
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Transient sheet error, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => {
                    if err.is_transient() {
                        warn!(op = label, attempt, "Retry budget exhausted: {}", err);
                    }
                    return Err(err);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quota_policy_shape() {
        let policy = RetryPolicy::quota();
        assert_eq!(policy.max_attempts(), 3);
        assert_eq!(policy.delay_after(1), Duration::from_secs(60));
        assert_eq!(policy.delay_after(2), Duration::from_secs(60));
    }

    #[test]
    fn test_exponential_growth() {
        let policy = RetryPolicy::exponential();
        assert_eq!(policy.max_attempts(), 6);
        assert_eq!(policy.delay_after(1), Duration::from_millis(400));
        let second = policy.delay_after(2).as_secs_f64();
        assert!((second - 0.68).abs() < 1e-6, "got {second}");
        let third = policy.delay_after(3).as_secs_f64();
        assert!((third - 1.156).abs() < 1e-6, "got {third}");
    }

    #[test]
    fn test_zero_attempts_means_one() {
        let policy = RetryPolicy::Fixed {
            delay: Duration::ZERO,
            max_attempts: 0,
        };
        assert_eq!(policy.max_attempts(), 1);
    }
}
