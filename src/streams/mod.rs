// ABOUTME: Stream fetchers turning health source queries into hourly and daily metric records
// ABOUTME: Shared fetch context plus one fetcher per metric family
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Stream Fetchers
//!
//! Each fetcher reads one metric family for the sync window and returns its
//! records, or the [`ProviderError`] that stopped it. Hourly queries cover
//! `[floor_hour(window_start), window_end)`; daily queries run from local
//! midnight to local midnight in the configured zone.
//!
//! Fetchers never touch the document store and never look up therapy
//! profiles; the orchestrator does both after every branch has joined.

/// Blood glucose: start/end, average, percent low/high, uROC
pub mod blood_glucose;
/// Hourly body mass
pub mod body_mass;
/// Basal and active energy
pub mod energy;
/// Move and exercise minutes
pub mod exercise;
/// Hourly heart rate and trailing daily average
pub mod heart_rate;
/// Days since period start
pub mod menstrual;
/// Daily resting heart rate
pub mod resting_heart_rate;
/// Sleep stage minutes per local day
pub mod sleep;

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use futures_util::stream::{self, StreamExt};
use insite_analytics::GlycemicThresholds;
use insite_core::constants::glucose::DEFAULT_TARGET_BG;
use insite_core::time::{floor_hour, local_days, LocalDay};
use insite_providers::{
    BucketStatistic, HealthDataSource, ProviderResult, QuantityMetric, StatisticsQuery,
};
use std::sync::Arc;

pub use blood_glucose::{fetch_blood_glucose, BloodGlucoseStreams};
pub use body_mass::fetch_body_mass;
pub use energy::{fetch_energy, EnergyStreams};
pub use exercise::{fetch_exercise, ExerciseStreams};
pub use heart_rate::{fetch_heart_rate, HeartRateStreams};
pub use menstrual::fetch_menstrual;
pub use resting_heart_rate::fetch_resting_heart_rate;
pub use sleep::fetch_sleep;

/// Everything a fetcher needs for one pass
#[derive(Clone)]
pub struct FetchContext {
    /// Health data source
    pub source: Arc<dyn HealthDataSource>,
    /// Window start
    pub window_start: DateTime<Utc>,
    /// Window end
    pub window_end: DateTime<Utc>,
    /// Zone for local days and hours
    pub tz: Tz,
    /// Percent low/high thresholds
    pub thresholds: GlycemicThresholds,
    /// uROC target
    pub target_bg: f64,
    /// Bound on per-bin sub-queries in flight
    pub max_concurrent_queries: usize,
}

impl FetchContext {
    /// Context with default thresholds, target, and concurrency
    #[must_use]
    pub fn new(
        source: Arc<dyn HealthDataSource>,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
        tz: Tz,
    ) -> Self {
        Self {
            source,
            window_start,
            window_end,
            tz,
            thresholds: GlycemicThresholds::default(),
            target_bg: DEFAULT_TARGET_BG,
            max_concurrent_queries: 16,
        }
    }

    /// Start of the first hourly bucket
    #[must_use]
    pub fn hourly_start(&self) -> DateTime<Utc> {
        floor_hour(self.window_start)
    }

    /// Whether the window holds at least one hourly bucket
    #[must_use]
    pub fn has_hours(&self) -> bool {
        self.hourly_start() < self.window_end
    }

    /// Local days touched by the window
    #[must_use]
    pub fn days(&self) -> Vec<LocalDay> {
        local_days(self.window_start, self.window_end, self.tz)
    }

    /// Concurrency bound, at least one
    #[must_use]
    pub fn concurrency(&self) -> usize {
        self.max_concurrent_queries.max(1)
    }

    /// Hourly statistics over the window; empty when the window has no hours
    ///
    /// # Errors
    ///
    /// Returns the source error
    pub async fn hourly_statistics(&self, metric: QuantityMetric) -> ProviderResult<Vec<BucketStatistic>> {
        if !self.has_hours() {
            return Ok(Vec::new());
        }
        let query = StatisticsQuery::hourly(metric, self.hourly_start(), self.window_end);
        self.source.statistics(&query).await
    }

    /// One statistic per local day of the window
    ///
    /// # Errors
    ///
    /// Returns the source error
    pub async fn daily_statistics(&self, metric: QuantityMetric) -> ProviderResult<Vec<(LocalDay, BucketStatistic)>> {
        let days = self.days();
        let (Some(first), Some(last)) = (days.first(), days.last()) else {
            return Ok(Vec::new());
        };
        let query = StatisticsQuery::daily(metric, first.start, last.end, self.tz);
        let buckets = self.source.statistics(&query).await?;
        Ok(days
            .into_iter()
            .filter_map(|day| {
                buckets
                    .iter()
                    .find(|bucket| bucket.start == day.start)
                    .map(|bucket| (day, *bucket))
            })
            .collect())
    }

    /// For each local day, the daily statistics of the trailing week ending with it.
    ///
    /// One sub-query per day, at most `concurrency()` in flight, results in day order.
    ///
    /// # Errors
    ///
    /// Returns the first source error
    pub async fn trailing_daily_statistics(
        &self,
        metric: QuantityMetric,
        trailing_days: i64,
    ) -> ProviderResult<Vec<(LocalDay, Vec<BucketStatistic>)>> {
        let queries = self.days().into_iter().map(|day| {
            let first = LocalDay::new(day.date - Duration::days(trailing_days - 1), self.tz);
            let query = StatisticsQuery::daily(metric, first.start, day.end, self.tz);
            let source = Arc::clone(&self.source);
            async move {
                let buckets = source.statistics(&query).await?;
                Ok::<_, insite_providers::ProviderError>((day, buckets))
            }
        });
        let results: Vec<ProviderResult<(LocalDay, Vec<BucketStatistic>)>> = stream::iter(queries)
            .buffered(self.concurrency())
            .collect()
            .await;
        results.into_iter().collect()
    }
}

/// Hour-keyed value of a statistic that has data
pub(crate) fn with_data<F>(buckets: &[BucketStatistic], value: F) -> Vec<(DateTime<Utc>, f64)>
where
    F: Fn(&BucketStatistic) -> Option<f64>,
{
    buckets
        .iter()
        .filter(|bucket| bucket.has_data())
        .filter_map(|bucket| value(bucket).map(|v| (bucket.start, v)))
        .collect()
}
