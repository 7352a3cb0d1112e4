// ABOUTME: In-memory synthetic health source for development, tests, and the CLI demo
// ABOUTME: Computes bucketed statistics from stored samples and supports failure/latency injection
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Synthetic Health Source
//!
//! A [`HealthDataSource`] backed by samples held in memory. Unlike a device
//! health store, the synthetic source:
//!
//! - Requires no authorization
//! - Accepts samples injected at runtime
//! - Produces deterministic results for tests
//! - Can be told to fail or stall on chosen metrics
//!
//! ## Instrumentation
//!
//! The source counts queries and tracks the peak number of queries in flight,
//! so tests can assert on retry counts and on bounded fan-out.
//!
//! ## Thread Safety
//!
//! Sample stores sit behind `RwLock`s; a poisoned lock is recovered rather than
//! propagated because the stored data is append-only.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock};
use std::time::Duration;
use tracing::debug;

use insite_core::errors::{ProviderError, ProviderResult};

use crate::core::{
    bucket_statistics, BucketStatistic, CategoryMetric, CategorySample, HealthDataSource,
    QuantityMetric, QuantitySample, SourceMetric, StatisticsQuery,
};

/// Default source name
pub const SYNTHETIC_SOURCE_NAME: &str = "synthetic";

/// In-memory health source
#[derive(Debug)]
pub struct SyntheticHealthSource {
    name: String,
    quantities: RwLock<HashMap<QuantityMetric, Vec<QuantitySample>>>,
    categories: RwLock<HashMap<CategoryMetric, Vec<CategorySample>>>,
    failures: RwLock<HashMap<SourceMetric, ProviderError>>,
    latencies: RwLock<HashMap<SourceMetric, Duration>>,
    queries: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl Default for SyntheticHealthSource {
    fn default() -> Self {
        Self::new()
    }
}

impl SyntheticHealthSource {
    /// Empty source
    #[must_use]
    pub fn new() -> Self {
        Self::with_name(SYNTHETIC_SOURCE_NAME)
    }

    /// Empty source with a custom name
    #[must_use]
    pub fn with_name(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            quantities: RwLock::new(HashMap::new()),
            categories: RwLock::new(HashMap::new()),
            failures: RwLock::new(HashMap::new()),
            latencies: RwLock::new(HashMap::new()),
            queries: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    /// Store numeric samples
    pub fn add_quantity_samples(&self, samples: impl IntoIterator<Item = QuantitySample>) {
        let mut store = self
            .quantities
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        for sample in samples {
            store.entry(sample.metric).or_default().push(sample);
        }
    }

    /// Store category samples
    pub fn add_category_samples(&self, samples: impl IntoIterator<Item = CategorySample>) {
        let mut store = self
            .categories
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        for sample in samples {
            store.entry(sample.metric).or_default().push(sample);
        }
    }

    /// Make every query for `metric` fail with `error`
    pub fn inject_failure(&self, metric: impl Into<SourceMetric>, error: ProviderError) {
        self.failures
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(metric.into(), error);
    }

    /// Stop failing queries for `metric`
    pub fn clear_failure(&self, metric: impl Into<SourceMetric>) {
        self.failures
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&metric.into());
    }

    /// Delay every query for `metric` by `latency`
    pub fn inject_latency(&self, metric: impl Into<SourceMetric>, latency: Duration) {
        self.latencies
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(metric.into(), latency);
    }

    /// Queries started so far
    #[must_use]
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    /// Highest number of queries that were in flight at once
    #[must_use]
    pub fn peak_concurrency(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    /// Stored numeric samples for `metric`
    #[must_use]
    pub fn quantity_len(&self, metric: QuantityMetric) -> usize {
        self.quantities
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&metric)
            .map_or(0, Vec::len)
    }

    /// Stored category samples for `metric`
    #[must_use]
    pub fn category_len(&self, metric: CategoryMetric) -> usize {
        self.categories
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&metric)
            .map_or(0, Vec::len)
    }

    async fn begin(&self, metric: SourceMetric) -> ProviderResult<InFlight<'_>> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(current, Ordering::SeqCst);
        let guard = InFlight(&self.in_flight);

        let latency = self
            .latencies
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&metric)
            .copied();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let failure = self
            .failures
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&metric)
            .cloned();
        if let Some(error) = failure {
            debug!(source = %self.name, metric = %metric, "injected failure");
            return Err(error);
        }
        Ok(guard)
    }

    fn quantities_between(
        &self,
        metric: QuantityMetric,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Vec<QuantitySample> {
        let mut samples: Vec<QuantitySample> = self
            .quantities
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&metric)
            .map(|stored| {
                stored
                    .iter()
                    .filter(|sample| start <= sample.start && sample.start < end)
                    .copied()
                    .collect()
            })
            .unwrap_or_default();
        samples.sort_by_key(|sample| sample.start);
        samples
    }
}

/// Decrements the in-flight counter when a query finishes or is cancelled
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl HealthDataSource for SyntheticHealthSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn statistics(&self, query: &StatisticsQuery) -> ProviderResult<Vec<BucketStatistic>> {
        query.validate()?;
        let _in_flight = self.begin(query.metric.into()).await?;
        let samples = self.quantities_between(query.metric, query.start, query.end);
        Ok(bucket_statistics(query, &samples))
    }

    async fn quantity_samples(
        &self,
        metric: QuantityMetric,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> ProviderResult<Vec<QuantitySample>> {
        let _in_flight = self.begin(metric.into()).await?;
        Ok(self.quantities_between(metric, start, end))
    }

    async fn category_samples(
        &self,
        metric: CategoryMetric,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> ProviderResult<Vec<CategorySample>> {
        let _in_flight = self.begin(metric.into()).await?;
        let mut samples: Vec<CategorySample> = self
            .categories
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&metric)
            .map(|stored| {
                stored
                    .iter()
                    .filter(|sample| start <= sample.start && sample.start < end)
                    .copied()
                    .collect()
            })
            .unwrap_or_default();
        samples.sort_by_key(|sample| sample.start);
        Ok(samples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CategoryValue, SleepState};
    use chrono::Duration as ChronoDuration;

    fn at(text: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(text).unwrap().with_timezone(&Utc)
    }

    #[tokio::test]
    async fn test_samples_use_strict_start() {
        let source = SyntheticHealthSource::new();
        source.add_quantity_samples([
            QuantitySample::at(QuantityMetric::HeartRate, at("2025-01-01T09:59:59Z"), 60.0),
            QuantitySample::at(QuantityMetric::HeartRate, at("2025-01-01T10:00:00Z"), 61.0),
            QuantitySample::at(QuantityMetric::HeartRate, at("2025-01-01T10:59:59Z"), 62.0),
            QuantitySample::at(QuantityMetric::HeartRate, at("2025-01-01T11:00:00Z"), 63.0),
        ]);
        let samples = source
            .quantity_samples(
                QuantityMetric::HeartRate,
                at("2025-01-01T10:00:00Z"),
                at("2025-01-01T11:00:00Z"),
            )
            .await
            .unwrap();
        let values: Vec<f64> = samples.iter().map(|s| s.value).collect();
        assert_eq!(values, vec![61.0, 62.0]);
    }

    #[tokio::test]
    async fn test_category_sample_crossing_window_end_is_kept() {
        let source = SyntheticHealthSource::new();
        let start = at("2025-01-01T23:00:00Z");
        source.add_category_samples([CategorySample {
            metric: CategoryMetric::SleepAnalysis,
            start,
            end: start + ChronoDuration::hours(3),
            value: CategoryValue::Sleep(SleepState::Core),
        }]);
        let samples = source
            .category_samples(CategoryMetric::SleepAnalysis, start, at("2025-01-02T00:00:00Z"))
            .await
            .unwrap();
        assert_eq!(samples.len(), 1);
    }

    #[tokio::test]
    async fn test_injected_failure_and_clear() {
        let source = SyntheticHealthSource::new();
        source.inject_failure(
            CategoryMetric::MenstrualFlow,
            ProviderError::Unauthorized {
                provider: "synthetic".to_owned(),
                metric: "menstrual_flow".to_owned(),
            },
        );
        let now = Utc::now();
        let failed = source
            .category_samples(CategoryMetric::MenstrualFlow, now - ChronoDuration::days(1), now)
            .await;
        assert!(failed.is_err());

        source.clear_failure(CategoryMetric::MenstrualFlow);
        let ok = source
            .category_samples(CategoryMetric::MenstrualFlow, now - ChronoDuration::days(1), now)
            .await;
        assert!(ok.unwrap().is_empty());
        assert_eq!(source.query_count(), 2);
    }

    #[tokio::test]
    async fn test_statistics_cover_every_bucket() {
        let source = SyntheticHealthSource::new();
        source.add_quantity_samples([QuantitySample::at(
            QuantityMetric::BloodGlucose,
            at("2025-01-01T01:30:00Z"),
            150.0,
        )]);
        let query = StatisticsQuery::hourly(
            QuantityMetric::BloodGlucose,
            at("2025-01-01T00:00:00Z"),
            at("2025-01-01T04:00:00Z"),
        );
        let stats = source.statistics(&query).await.unwrap();
        assert_eq!(stats.len(), 4);
        assert_eq!(stats.iter().filter(|s| s.has_data()).count(), 1);
        assert_eq!(source.peak_concurrency(), 1);
    }
}
