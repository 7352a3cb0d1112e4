// ABOUTME: Decorator adding deadlines, retries, and a circuit breaker to any health source
// ABOUTME: Every query through GuardedSource is bounded in time and fails fast when the source is down
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

use insite_core::errors::ProviderResult;

use crate::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig};
use crate::core::{
    BucketStatistic, CategoryMetric, CategorySample, HealthDataSource, QuantityMetric,
    QuantitySample, StatisticsQuery,
};
use crate::utils::{with_deadline, with_retry, RetryBackoffConfig};

/// Resilience settings for a guarded source
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GuardConfig {
    /// Deadline for each attempt of each query
    pub query_timeout: Duration,
    /// Backoff for retryable failures
    pub retry: RetryBackoffConfig,
    /// Circuit breaker thresholds
    pub breaker: CircuitBreakerConfig,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            query_timeout: Duration::from_secs(30),
            retry: RetryBackoffConfig::default(),
            breaker: CircuitBreakerConfig::default(),
        }
    }
}

/// Health source wrapped with a per-attempt deadline, bounded retry, and a circuit breaker.
///
/// The breaker sees the outcome after retries, so one flaky query counts once.
pub struct GuardedSource {
    inner: Arc<dyn HealthDataSource>,
    breaker: CircuitBreaker,
    config: GuardConfig,
}

impl GuardedSource {
    /// Wrap `inner`
    #[must_use]
    pub fn new(inner: Arc<dyn HealthDataSource>, config: GuardConfig) -> Self {
        let breaker = CircuitBreaker::with_config(inner.name(), config.breaker);
        Self {
            inner,
            breaker,
            config,
        }
    }

    /// Breaker state, for diagnostics
    #[must_use]
    pub const fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    async fn guarded<T, F, Fut>(&self, operation: &str, call: F) -> ProviderResult<T>
    where
        F: Fn() -> Fut + Send + Sync,
        Fut: std::future::Future<Output = ProviderResult<T>> + Send,
        T: Send,
    {
        let timeout = self.config.query_timeout;
        self.breaker
            .call(with_retry(&self.config.retry, operation, || {
                with_deadline(timeout, operation, call())
            }))
            .await
    }
}

#[async_trait]
impl HealthDataSource for GuardedSource {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn statistics(&self, query: &StatisticsQuery) -> ProviderResult<Vec<BucketStatistic>> {
        query.validate()?;
        let operation = format!("statistics {}", query.metric);
        self.guarded(&operation, || self.inner.statistics(query))
            .await
    }

    async fn quantity_samples(
        &self,
        metric: QuantityMetric,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> ProviderResult<Vec<QuantitySample>> {
        let operation = format!("samples {metric}");
        self.guarded(&operation, || self.inner.quantity_samples(metric, start, end))
            .await
    }

    async fn category_samples(
        &self,
        metric: CategoryMetric,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> ProviderResult<Vec<CategorySample>> {
        let operation = format!("samples {metric}");
        self.guarded(&operation, || self.inner.category_samples(metric, start, end))
            .await
    }
}
