// ABOUTME: Core health data source trait and query/response types
// ABOUTME: Quantity and category metrics, bucketed statistics, and raw sample queries
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Health Data Source Boundary
//!
//! The sync pipeline never talks to a wearable platform directly. It asks a
//! [`HealthDataSource`] for either time-bucketed statistics or raw samples and
//! receives a [`ProviderResult`]. A failed query is an error value on that one
//! query; callers decide whether to degrade or propagate.
//!
//! ## Bucketing
//!
//! A [`StatisticsQuery`] covers `[start, end)`. Buckets are anchored at `start`
//! and step by one hour, or by one local calendar day in the query's zone. Every
//! bucket in the range is returned, including empty ones (`count == 0`, all
//! values absent). The final bucket is clipped to `end`.
//!
//! ## Sample membership
//!
//! Raw sample queries use strict-start membership: a sample belongs to a window
//! when `start <= sample.start < end`, regardless of where it ends.

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fmt;

use insite_core::errors::{ProviderError, ProviderResult};

/// Numeric metrics available from the source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuantityMetric {
    /// Blood glucose, mg/dL
    BloodGlucose,
    /// Heart rate, count/min
    HeartRate,
    /// Resting heart rate, count/min
    RestingHeartRate,
    /// Basal energy burned, kcal
    BasalEnergy,
    /// Active energy burned, kcal
    ActiveEnergy,
    /// Move time, minutes
    MoveTime,
    /// Exercise time, minutes
    ExerciseTime,
    /// Body mass, kg
    BodyMass,
}

impl QuantityMetric {
    /// Every quantity metric
    pub const ALL: [Self; 8] = [
        Self::BloodGlucose,
        Self::HeartRate,
        Self::RestingHeartRate,
        Self::BasalEnergy,
        Self::ActiveEnergy,
        Self::MoveTime,
        Self::ExerciseTime,
        Self::BodyMass,
    ];

    /// Stable identifier for logs and error messages
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BloodGlucose => "blood_glucose",
            Self::HeartRate => "heart_rate",
            Self::RestingHeartRate => "resting_heart_rate",
            Self::BasalEnergy => "basal_energy",
            Self::ActiveEnergy => "active_energy",
            Self::MoveTime => "move_time",
            Self::ExerciseTime => "exercise_time",
            Self::BodyMass => "body_mass",
        }
    }

    /// Unit the values are expressed in
    #[must_use]
    pub const fn unit(self) -> &'static str {
        match self {
            Self::BloodGlucose => "mg/dL",
            Self::HeartRate | Self::RestingHeartRate => "count/min",
            Self::BasalEnergy | Self::ActiveEnergy => "kcal",
            Self::MoveTime | Self::ExerciseTime => "min",
            Self::BodyMass => "kg",
        }
    }
}

impl fmt::Display for QuantityMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Categorical metrics available from the source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryMetric {
    /// Sleep stage intervals
    SleepAnalysis,
    /// Menstrual flow days
    MenstrualFlow,
}

impl CategoryMetric {
    /// Stable identifier for logs and error messages
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SleepAnalysis => "sleep_analysis",
            Self::MenstrualFlow => "menstrual_flow",
        }
    }
}

impl fmt::Display for CategoryMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Either kind of metric, used to key failure and latency injection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SourceMetric {
    /// A numeric metric
    Quantity(QuantityMetric),
    /// A categorical metric
    Category(CategoryMetric),
}

impl From<QuantityMetric> for SourceMetric {
    fn from(metric: QuantityMetric) -> Self {
        Self::Quantity(metric)
    }
}

impl From<CategoryMetric> for SourceMetric {
    fn from(metric: CategoryMetric) -> Self {
        Self::Category(metric)
    }
}

impl fmt::Display for SourceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Quantity(metric) => metric.fmt(f),
            Self::Category(metric) => metric.fmt(f),
        }
    }
}

/// Sleep stage of a sleep-analysis sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SleepState {
    /// In bed, not necessarily asleep
    InBed,
    /// Awake during the sleep session
    Awake,
    /// Core (light) sleep
    Core,
    /// Deep sleep
    Deep,
    /// REM sleep
    Rem,
    /// Asleep, stage unknown
    Unspecified,
}

/// Menstrual flow level of a day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowLevel {
    /// Flow recorded without a level
    Unspecified,
    /// Explicitly no flow
    None,
    /// Light flow
    Light,
    /// Medium flow
    Medium,
    /// Heavy flow
    Heavy,
}

impl FlowLevel {
    /// Whether this level counts as a period day
    #[must_use]
    pub const fn is_flow(self) -> bool {
        !matches!(self, Self::None)
    }
}

/// Value carried by a category sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum CategoryValue {
    /// Sleep stage
    Sleep(SleepState),
    /// Menstrual flow
    Flow(FlowLevel),
}

/// A raw numeric reading
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuantitySample {
    /// Metric the reading belongs to
    pub metric: QuantityMetric,
    /// Reading start
    pub start: DateTime<Utc>,
    /// Reading end (equal to start for instantaneous readings)
    pub end: DateTime<Utc>,
    /// Value in the metric's unit
    pub value: f64,
}

impl QuantitySample {
    /// Instantaneous reading at `at`
    #[must_use]
    pub const fn at(metric: QuantityMetric, at: DateTime<Utc>, value: f64) -> Self {
        Self {
            metric,
            start: at,
            end: at,
            value,
        }
    }
}

/// A raw categorical interval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySample {
    /// Metric the interval belongs to
    pub metric: CategoryMetric,
    /// Interval start
    pub start: DateTime<Utc>,
    /// Interval end
    pub end: DateTime<Utc>,
    /// Category value
    pub value: CategoryValue,
}

/// Bucket width for statistics queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BucketWidth {
    /// One hour
    Hour,
    /// One local calendar day
    Day,
}

/// Bucketed statistics request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatisticsQuery {
    /// Metric to aggregate
    pub metric: QuantityMetric,
    /// Inclusive start, also the bucket anchor
    pub start: DateTime<Utc>,
    /// Exclusive end
    pub end: DateTime<Utc>,
    /// Bucket width
    pub bucket: BucketWidth,
    /// Zone used for day buckets
    pub tz: Tz,
}

impl StatisticsQuery {
    /// Hourly buckets over `[start, end)`
    #[must_use]
    pub const fn hourly(metric: QuantityMetric, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            metric,
            start,
            end,
            bucket: BucketWidth::Hour,
            tz: Tz::UTC,
        }
    }

    /// Local-day buckets over `[start, end)`
    #[must_use]
    pub const fn daily(
        metric: QuantityMetric,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        tz: Tz,
    ) -> Self {
        Self {
            metric,
            start,
            end,
            bucket: BucketWidth::Day,
            tz,
        }
    }

    /// Check the window is non-empty
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::InvalidQuery` when `end <= start`.
    pub fn validate(&self) -> ProviderResult<()> {
        if self.end <= self.start {
            return Err(ProviderError::InvalidQuery(format!(
                "{} window ends at {} before it starts at {}",
                self.metric, self.end, self.start
            )));
        }
        Ok(())
    }

    /// Bucket boundaries as `(start, end)` pairs, oldest first
    #[must_use]
    pub fn buckets(&self) -> Vec<(DateTime<Utc>, DateTime<Utc>)> {
        let mut buckets = Vec::new();
        let mut cursor = self.start;
        while cursor < self.end {
            let next = self.next_boundary(cursor).min(self.end);
            buckets.push((cursor, next));
            cursor = next;
        }
        buckets
    }

    fn next_boundary(&self, cursor: DateTime<Utc>) -> DateTime<Utc> {
        match self.bucket {
            BucketWidth::Hour => cursor + Duration::hours(1),
            BucketWidth::Day => {
                let local = cursor.with_timezone(&self.tz).naive_local() + Duration::days(1);
                self.tz
                    .from_local_datetime(&local)
                    .earliest()
                    .map_or(cursor + Duration::days(1), |next| next.with_timezone(&Utc))
                    .max(cursor + Duration::hours(1))
            }
        }
    }
}

/// Aggregate of the samples whose start falls in one bucket
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BucketStatistic {
    /// Bucket start
    pub start: DateTime<Utc>,
    /// Bucket end
    pub end: DateTime<Utc>,
    /// Mean value
    pub average: Option<f64>,
    /// Smallest value
    pub minimum: Option<f64>,
    /// Largest value
    pub maximum: Option<f64>,
    /// Sum of values
    pub sum: Option<f64>,
    /// Value of the earliest-starting sample
    pub first: Option<f64>,
    /// Value of the latest-starting sample
    pub last: Option<f64>,
    /// Number of samples
    pub count: usize,
}

impl BucketStatistic {
    /// A bucket with no samples
    #[must_use]
    pub const fn empty(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start,
            end,
            average: None,
            minimum: None,
            maximum: None,
            sum: None,
            first: None,
            last: None,
            count: 0,
        }
    }

    /// Whether any sample fell in the bucket
    #[must_use]
    pub const fn has_data(&self) -> bool {
        self.count > 0
    }
}

/// Aggregate `samples` into the buckets described by `query`.
///
/// `samples` may be in any order; ties on start time keep input order.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn bucket_statistics(query: &StatisticsQuery, samples: &[QuantitySample]) -> Vec<BucketStatistic> {
    let mut sorted: Vec<&QuantitySample> = samples
        .iter()
        .filter(|sample| sample.metric == query.metric)
        .collect();
    sorted.sort_by_key(|sample| sample.start);

    query
        .buckets()
        .into_iter()
        .map(|(start, end)| {
            let lower = sorted.partition_point(|sample| sample.start < start);
            let upper = sorted.partition_point(|sample| sample.start < end);
            let members = &sorted[lower..upper];
            if members.is_empty() {
                return BucketStatistic::empty(start, end);
            }
            let sum: f64 = members.iter().map(|sample| sample.value).sum();
            let minimum = members
                .iter()
                .map(|sample| sample.value)
                .fold(f64::INFINITY, f64::min);
            let maximum = members
                .iter()
                .map(|sample| sample.value)
                .fold(f64::NEG_INFINITY, f64::max);
            BucketStatistic {
                start,
                end,
                average: Some(sum / members.len() as f64),
                minimum: Some(minimum),
                maximum: Some(maximum),
                sum: Some(sum),
                first: members.first().map(|sample| sample.value),
                last: members.last().map(|sample| sample.value),
                count: members.len(),
            }
        })
        .collect()
}

/// Read access to a person's health data
///
/// Implementations must be cheap to share across concurrent sync branches.
#[async_trait]
pub trait HealthDataSource: Send + Sync {
    /// Source name for logs and errors
    fn name(&self) -> &str;

    /// Bucketed statistics for one metric, every bucket included
    async fn statistics(&self, query: &StatisticsQuery) -> ProviderResult<Vec<BucketStatistic>>;

    /// Raw numeric samples with `start <= sample.start < end`, ascending by start
    async fn quantity_samples(
        &self,
        metric: QuantityMetric,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> ProviderResult<Vec<QuantitySample>>;

    /// Raw category samples with `start <= sample.start < end`, ascending by start
    async fn category_samples(
        &self,
        metric: CategoryMetric,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> ProviderResult<Vec<CategorySample>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(text: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(text).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_hourly_buckets_clip_last() {
        let query = StatisticsQuery::hourly(
            QuantityMetric::BloodGlucose,
            at("2025-01-01T10:00:00Z"),
            at("2025-01-01T12:30:00Z"),
        );
        let buckets = query.buckets();
        assert_eq!(buckets.len(), 3);
        assert_eq!(buckets[2], (at("2025-01-01T12:00:00Z"), at("2025-01-01T12:30:00Z")));
    }

    #[test]
    fn test_daily_buckets_follow_local_midnight() {
        let tz: Tz = "America/New_York".parse().unwrap();
        let query = StatisticsQuery::daily(
            QuantityMetric::RestingHeartRate,
            at("2025-03-08T05:00:00Z"),
            at("2025-03-10T04:00:00Z"),
            tz,
        );
        let buckets = query.buckets();
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].1, at("2025-03-09T05:00:00Z"));
        assert_eq!((buckets[1].1 - buckets[1].0).num_hours(), 23);
    }

    #[test]
    fn test_bucket_statistics_includes_empty_buckets() {
        let query = StatisticsQuery::hourly(
            QuantityMetric::BloodGlucose,
            at("2025-01-01T00:00:00Z"),
            at("2025-01-01T03:00:00Z"),
        );
        let samples = [
            QuantitySample::at(QuantityMetric::BloodGlucose, at("2025-01-01T00:50:00Z"), 140.0),
            QuantitySample::at(QuantityMetric::BloodGlucose, at("2025-01-01T00:05:00Z"), 100.0),
            QuantitySample::at(QuantityMetric::BloodGlucose, at("2025-01-01T02:00:00Z"), 90.0),
            QuantitySample::at(QuantityMetric::HeartRate, at("2025-01-01T01:00:00Z"), 70.0),
        ];
        let stats = bucket_statistics(&query, &samples);
        assert_eq!(stats.len(), 3);

        assert_eq!(stats[0].count, 2);
        assert_eq!(stats[0].first, Some(100.0));
        assert_eq!(stats[0].last, Some(140.0));
        assert_eq!(stats[0].average, Some(120.0));
        assert_eq!(stats[0].minimum, Some(100.0));
        assert_eq!(stats[0].maximum, Some(140.0));

        assert!(!stats[1].has_data());
        assert_eq!(stats[1].average, None);

        assert_eq!(stats[2].count, 1);
        assert_eq!(stats[2].sum, Some(90.0));
    }

    #[test]
    fn test_empty_window_is_invalid() {
        let instant = at("2025-01-01T00:00:00Z");
        let query = StatisticsQuery::hourly(QuantityMetric::HeartRate, instant, instant);
        assert!(matches!(query.validate(), Err(ProviderError::InvalidQuery(_))));
        assert!(query.buckets().is_empty());
    }
}
