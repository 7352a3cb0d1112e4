// ABOUTME: Retry with exponential backoff and per-call deadlines for source queries
// ABOUTME: Backoff settings load from environment variables with typed defaults
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use rand::Rng;
use std::env;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use insite_core::errors::{ProviderError, ProviderResult};

/// Environment variable for the maximum number of attempts
pub const ENV_RETRY_MAX_ATTEMPTS: &str = "INSITE_RETRY_MAX_ATTEMPTS";
/// Environment variable for the first backoff delay in milliseconds
pub const ENV_RETRY_BASE_DELAY_MS: &str = "INSITE_RETRY_BASE_DELAY_MS";
/// Environment variable for the backoff ceiling in milliseconds
pub const ENV_RETRY_MAX_DELAY_MS: &str = "INSITE_RETRY_MAX_DELAY_MS";
/// Environment variable for the jitter factor (0.0-1.0)
pub const ENV_RETRY_JITTER_FACTOR: &str = "INSITE_RETRY_JITTER_FACTOR";

/// Exponential backoff settings for retryable source errors
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryBackoffConfig {
    /// Total attempts including the first one
    pub max_attempts: u32,
    /// Delay before the first retry
    pub base_delay: Duration,
    /// Upper bound on any single delay
    pub max_delay: Duration,
    /// Random spread applied to each delay, as a fraction of it
    pub jitter_factor: f64,
}

impl Default for RetryBackoffConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(5),
            jitter_factor: 0.1,
        }
    }
}

impl RetryBackoffConfig {
    /// No retries: a single attempt
    #[must_use]
    pub const fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            jitter_factor: 0.0,
        }
    }

    /// Load from the environment, falling back to defaults for missing or unparsable values
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_attempts: env_or(ENV_RETRY_MAX_ATTEMPTS, defaults.max_attempts).max(1),
            base_delay: Duration::from_millis(env_or(
                ENV_RETRY_BASE_DELAY_MS,
                250,
            )),
            max_delay: Duration::from_millis(env_or(ENV_RETRY_MAX_DELAY_MS, 5_000)),
            jitter_factor: env_or(ENV_RETRY_JITTER_FACTOR, defaults.jitter_factor).clamp(0.0, 1.0),
        }
    }

    /// Delay before retry number `retry` (1-based), without jitter
    #[must_use]
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    fn jittered(&self, delay: Duration) -> Duration {
        if self.jitter_factor <= 0.0 || delay.is_zero() {
            return delay;
        }
        let spread = rand::thread_rng().gen_range(-self.jitter_factor..=self.jitter_factor);
        delay.mul_f64((1.0 + spread).max(0.0))
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

/// Run `operation` until it succeeds, fails with a non-retryable error, or
/// runs out of attempts.
///
/// # Errors
///
/// Returns the last error produced by `operation`.
pub async fn with_retry<F, Fut, T>(
    config: &RetryBackoffConfig,
    operation_name: &str,
    mut operation: F,
) -> ProviderResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ProviderResult<T>>,
{
    let mut attempt = 1;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(error) if error.is_retryable() && attempt < config.max_attempts => {
                let delay = config.jittered(config.delay_for(attempt));
                warn!(
                    operation = operation_name,
                    attempt,
                    max_attempts = config.max_attempts,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    error = %error,
                    "retrying source query"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(error) => {
                debug!(operation = operation_name, attempt, error = %error, "source query gave up");
                return Err(error);
            }
        }
    }
}

/// Run with the default backoff settings
///
/// # Errors
///
/// Returns the last error produced by `operation`.
pub async fn with_retry_default<F, Fut, T>(operation_name: &str, operation: F) -> ProviderResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ProviderResult<T>>,
{
    with_retry(&RetryBackoffConfig::default(), operation_name, operation).await
}

/// Bound `future` by `deadline`, mapping expiry to `ProviderError::Timeout`.
///
/// Dropping the future on expiry cancels any work it was driving.
///
/// # Errors
///
/// Returns `Timeout` when the deadline elapses, otherwise the future's own result.
pub async fn with_deadline<Fut, T>(
    deadline: Duration,
    operation_name: &str,
    future: Fut,
) -> ProviderResult<T>
where
    Fut: Future<Output = ProviderResult<T>>,
{
    tokio::time::timeout(deadline, future)
        .await
        .unwrap_or_else(|_| {
            Err(ProviderError::Timeout {
                operation: operation_name.to_owned(),
                seconds: deadline.as_secs(),
            })
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast() -> RetryBackoffConfig {
        RetryBackoffConfig {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
            jitter_factor: 0.0,
        }
    }

    #[test]
    fn test_delay_doubles_and_caps() {
        let config = RetryBackoffConfig {
            max_attempts: 5,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(300),
            jitter_factor: 0.0,
        };
        assert_eq!(config.delay_for(1), Duration::from_millis(100));
        assert_eq!(config.delay_for(2), Duration::from_millis(200));
        assert_eq!(config.delay_for(3), Duration::from_millis(300));
    }

    #[tokio::test]
    async fn test_retries_until_success() {
        let counter = AtomicU32::new(0);
        let attempts = &counter;
        let result = with_retry(&fast(), "statistics", || async move {
            if attempts.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(ProviderError::query_failed("synthetic", "heart_rate", "flaky"))
            } else {
                Ok(7)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_does_not_retry_permanent_errors() {
        let counter = AtomicU32::new(0);
        let attempts = &counter;
        let result: ProviderResult<()> = with_retry(&fast(), "statistics", || async move {
            attempts.fetch_add(1, Ordering::SeqCst);
            Err(ProviderError::Unauthorized {
                provider: "synthetic".to_owned(),
                metric: "blood_glucose".to_owned(),
            })
        })
        .await;
        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let counter = AtomicU32::new(0);
        let attempts = &counter;
        let result: ProviderResult<()> = with_retry(&fast(), "statistics", || async move {
            attempts.fetch_add(1, Ordering::SeqCst);
            Err(ProviderError::query_failed("synthetic", "heart_rate", "down"))
        })
        .await;
        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_maps_to_timeout() {
        let result: ProviderResult<()> = with_deadline(Duration::from_secs(2), "samples", async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok(())
        })
        .await;
        assert!(matches!(result, Err(ProviderError::Timeout { seconds: 2, .. })));
    }
}
