// ABOUTME: Circuit breaker guarding health data source queries
// ABOUTME: Fails fast while a source keeps failing, then probes for recovery
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::future::Future;
use std::sync::atomic::{AtomicU32, AtomicU64, AtomicU8, Ordering};
use std::time::{Duration, Instant};
use tracing::{info, warn};

use insite_core::errors::ProviderError;

/// Circuit breaker states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Queries pass through; consecutive failures are counted
    Closed,
    /// Queries fail immediately until the recovery timeout elapses
    Open,
    /// Queries pass through as recovery probes
    HalfOpen,
}

impl CircuitState {
    const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Closed,
            1 => Self::Open,
            _ => Self::HalfOpen,
        }
    }

    const fn to_u8(self) -> u8 {
        match self {
            Self::Closed => 0,
            Self::Open => 1,
            Self::HalfOpen => 2,
        }
    }
}

/// Thresholds for tripping and closing the circuit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitBreakerConfig {
    /// Consecutive retryable failures that open the circuit
    pub failure_threshold: u32,
    /// Time the circuit stays open before probing
    pub recovery_timeout: Duration,
    /// Successful probes needed to close the circuit again
    pub success_threshold: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(30),
            success_threshold: 2,
        }
    }
}

impl CircuitBreakerConfig {
    /// Create a configuration
    #[must_use]
    pub const fn new(
        failure_threshold: u32,
        recovery_timeout: Duration,
        success_threshold: u32,
    ) -> Self {
        Self {
            failure_threshold,
            recovery_timeout,
            success_threshold,
        }
    }

    /// Trip quickly and wait longer, for flaky sources
    #[must_use]
    pub const fn strict() -> Self {
        Self::new(3, Duration::from_secs(60), 3)
    }

    /// Tolerate bursts of failures, for sources that usually recover on their own
    #[must_use]
    pub const fn lenient() -> Self {
        Self::new(10, Duration::from_secs(15), 1)
    }
}

/// Lock-free circuit breaker shared by every branch querying one source.
///
/// Only retryable [`ProviderError`]s count as failures: an unauthorized metric
/// or a malformed query says nothing about the source's health.
#[derive(Debug)]
pub struct CircuitBreaker {
    source: String,
    config: CircuitBreakerConfig,
    state: AtomicU8,
    consecutive_failures: AtomicU32,
    probe_successes: AtomicU32,
    opened_at_ms: AtomicU64,
    epoch: Instant,
}

impl CircuitBreaker {
    /// Breaker with the default thresholds
    #[must_use]
    pub fn new(source: &str) -> Self {
        Self::with_config(source, CircuitBreakerConfig::default())
    }

    /// Breaker with custom thresholds
    #[must_use]
    pub fn with_config(source: &str, config: CircuitBreakerConfig) -> Self {
        Self {
            source: source.to_owned(),
            config,
            state: AtomicU8::new(CircuitState::Closed.to_u8()),
            consecutive_failures: AtomicU32::new(0),
            probe_successes: AtomicU32::new(0),
            opened_at_ms: AtomicU64::new(0),
            epoch: Instant::now(),
        }
    }

    /// Current state
    #[must_use]
    pub fn state(&self) -> CircuitState {
        CircuitState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// Consecutive failures counted while closed
    #[must_use]
    pub fn failure_count(&self) -> u32 {
        self.consecutive_failures.load(Ordering::SeqCst)
    }

    /// Admit a query or reject it with `CircuitBreakerOpen`
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::CircuitBreakerOpen` while open and the recovery
    /// timeout has not elapsed.
    pub fn admit(&self) -> Result<(), ProviderError> {
        match self.state() {
            CircuitState::Closed | CircuitState::HalfOpen => Ok(()),
            CircuitState::Open if self.recovery_due() => {
                if self
                    .state
                    .compare_exchange(
                        CircuitState::Open.to_u8(),
                        CircuitState::HalfOpen.to_u8(),
                        Ordering::SeqCst,
                        Ordering::SeqCst,
                    )
                    .is_ok()
                {
                    self.probe_successes.store(0, Ordering::SeqCst);
                    info!(source = %self.source, "circuit half-open, probing source");
                }
                Ok(())
            }
            CircuitState::Open => Err(ProviderError::CircuitBreakerOpen {
                provider: self.source.clone(),
                retry_after_secs: self.secs_until_recovery(),
            }),
        }
    }

    /// Record a successful query
    pub fn on_success(&self) {
        match self.state() {
            CircuitState::Closed => self.consecutive_failures.store(0, Ordering::SeqCst),
            CircuitState::HalfOpen => {
                let successes = self.probe_successes.fetch_add(1, Ordering::SeqCst) + 1;
                if successes >= self.config.success_threshold {
                    self.close();
                    info!(source = %self.source, "circuit closed, source recovered");
                }
            }
            CircuitState::Open => {}
        }
    }

    /// Record a failed query that counts against the source
    pub fn on_failure(&self) {
        match self.state() {
            CircuitState::Closed => {
                let failures = self.consecutive_failures.fetch_add(1, Ordering::SeqCst) + 1;
                if failures >= self.config.failure_threshold {
                    self.open();
                    warn!(
                        source = %self.source,
                        failures,
                        threshold = self.config.failure_threshold,
                        recovery_timeout_secs = self.config.recovery_timeout.as_secs(),
                        "circuit opened, source failing"
                    );
                }
            }
            CircuitState::HalfOpen => {
                self.open();
                warn!(source = %self.source, "circuit re-opened, recovery probe failed");
            }
            CircuitState::Open => self.opened_at_ms.store(self.elapsed_ms(), Ordering::SeqCst),
        }
    }

    /// Run `operation` under the breaker
    ///
    /// # Errors
    ///
    /// Returns `CircuitBreakerOpen` without running `operation` while open,
    /// otherwise whatever `operation` returns.
    pub async fn call<F, T>(&self, operation: F) -> Result<T, ProviderError>
    where
        F: Future<Output = Result<T, ProviderError>>,
    {
        self.admit()?;
        let result = operation.await;
        match &result {
            Ok(_) => self.on_success(),
            Err(error) if error.is_retryable() => self.on_failure(),
            Err(_) => {}
        }
        result
    }

    /// Force the circuit closed
    pub fn reset(&self) {
        self.close();
        info!(source = %self.source, "circuit manually reset");
    }

    fn open(&self) {
        self.state
            .store(CircuitState::Open.to_u8(), Ordering::SeqCst);
        self.opened_at_ms.store(self.elapsed_ms(), Ordering::SeqCst);
        self.probe_successes.store(0, Ordering::SeqCst);
    }

    fn close(&self) {
        self.state
            .store(CircuitState::Closed.to_u8(), Ordering::SeqCst);
        self.consecutive_failures.store(0, Ordering::SeqCst);
        self.probe_successes.store(0, Ordering::SeqCst);
    }

    fn recovery_due(&self) -> bool {
        self.elapsed_ms()
            .saturating_sub(self.opened_at_ms.load(Ordering::SeqCst))
            >= self.recovery_ms()
    }

    fn secs_until_recovery(&self) -> u64 {
        let since_open = self
            .elapsed_ms()
            .saturating_sub(self.opened_at_ms.load(Ordering::SeqCst));
        self.recovery_ms()
            .saturating_sub(since_open)
            .div_ceil(1_000)
    }

    #[allow(clippy::cast_possible_truncation)]
    fn recovery_ms(&self) -> u64 {
        self.config.recovery_timeout.as_millis() as u64
    }

    #[allow(clippy::cast_possible_truncation)]
    fn elapsed_ms(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failing() -> ProviderError {
        ProviderError::query_failed("synthetic", "heart_rate", "boom")
    }

    #[tokio::test]
    async fn test_opens_after_threshold_and_rejects() {
        let breaker =
            CircuitBreaker::with_config("synthetic", CircuitBreakerConfig::new(2, Duration::from_secs(60), 1));
        for _ in 0..2 {
            let result: Result<(), _> = breaker.call(async { Err(failing()) }).await;
            assert!(result.is_err());
        }
        assert_eq!(breaker.state(), CircuitState::Open);

        let rejected: Result<u32, _> = breaker.call(async { Ok(1) }).await;
        assert!(matches!(
            rejected,
            Err(ProviderError::CircuitBreakerOpen { retry_after_secs, .. }) if retry_after_secs > 0
        ));
    }

    #[tokio::test]
    async fn test_non_retryable_errors_do_not_trip() {
        let breaker =
            CircuitBreaker::with_config("synthetic", CircuitBreakerConfig::new(1, Duration::from_secs(60), 1));
        let result: Result<(), _> = breaker
            .call(async { Err(ProviderError::InvalidQuery("empty".to_owned())) })
            .await;
        assert!(result.is_err());
        assert_eq!(breaker.state(), CircuitState::Closed);
        assert_eq!(breaker.failure_count(), 0);
    }

    #[tokio::test]
    async fn test_recovers_through_half_open() {
        let breaker =
            CircuitBreaker::with_config("synthetic", CircuitBreakerConfig::new(1, Duration::ZERO, 2));
        let _: Result<(), _> = breaker.call(async { Err(failing()) }).await;
        assert_eq!(breaker.state(), CircuitState::Open);

        let first: Result<u8, _> = breaker.call(async { Ok(1) }).await;
        assert!(first.is_ok());
        assert_eq!(breaker.state(), CircuitState::HalfOpen);

        let second: Result<u8, _> = breaker.call(async { Ok(2) }).await;
        assert!(second.is_ok());
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_failed_probe_reopens() {
        let breaker =
            CircuitBreaker::with_config("synthetic", CircuitBreakerConfig::new(1, Duration::ZERO, 1));
        let _: Result<(), _> = breaker.call(async { Err(failing()) }).await;
        let _: Result<(), _> = breaker.call(async { Err(failing()) }).await;
        assert_eq!(breaker.state(), CircuitState::Open);
        breaker.reset();
        assert_eq!(breaker.state(), CircuitState::Closed);
    }
}
