// ABOUTME: Integration tests for the per-metric fetchers against the synthetic source
// ABOUTME: Covers glucose thresholds and gaps, bounded fan-out, local-day sleep, and cycle lookback
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use common::{add_readings, at, init_test_logging};
use insite_analytics::GlycemicThresholds;
use insite_core::errors::ProviderError;
use insite_providers::{
    CategoryMetric, CategorySample, CategoryValue, FlowLevel, QuantityMetric, QuantitySample,
    SleepState, SyntheticHealthSource,
};
use insite_sync::streams::{
    fetch_blood_glucose, fetch_body_mass, fetch_menstrual, fetch_sleep, FetchContext,
};
use std::sync::Arc;

fn context(source: SyntheticHealthSource, start: DateTime<Utc>, end: DateTime<Utc>, tz: Tz) -> FetchContext {
    init_test_logging();
    FetchContext::new(Arc::new(source), start, end, tz)
}

fn sleep(start: &str, end: &str, state: SleepState) -> CategorySample {
    CategorySample {
        metric: CategoryMetric::SleepAnalysis,
        start: at(start),
        end: at(end),
        value: CategoryValue::Sleep(state),
    }
}

fn flow(day: &str, level: FlowLevel) -> CategorySample {
    let start = at(&format!("{day}T08:00:00Z"));
    CategorySample {
        metric: CategoryMetric::MenstrualFlow,
        start,
        end: start + Duration::hours(1),
        value: CategoryValue::Flow(level),
    }
}

#[tokio::test]
async fn test_glucose_thresholds_are_strict() {
    let source = SyntheticHealthSource::new();
    let base = at("2025-01-01T00:00:00Z");
    source.add_quantity_samples([79.0, 80.0, 180.0, 181.0].into_iter().enumerate().map(
        |(index, value)| {
            let minute = i64::try_from(index).unwrap() * 10;
            QuantitySample::at(QuantityMetric::BloodGlucose, base + Duration::minutes(minute), value)
        },
    ));
    let mut ctx = context(source, base, base + Duration::hours(1), Tz::UTC);
    ctx.thresholds = GlycemicThresholds::new(80.0, 180.0).unwrap();

    let streams = fetch_blood_glucose(&ctx).await.unwrap();

    assert_eq!(streams.percentages.len(), 1);
    // Readings equal to a bound count as in range
    assert!((streams.percentages[0].percent_low - 25.0).abs() < 1e-9);
    assert!((streams.percentages[0].percent_high - 25.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_glucose_gap_hours_keep_bucket_records() {
    let source = SyntheticHealthSource::new();
    let base = at("2025-01-01T00:00:00Z");
    add_readings(&source, QuantityMetric::BloodGlucose, base, base + Duration::hours(1), |_| 150.0);
    add_readings(
        &source,
        QuantityMetric::BloodGlucose,
        base + Duration::hours(3),
        base + Duration::hours(4),
        |_| 90.0,
    );
    let ctx = context(source, base, base + Duration::hours(4), Tz::UTC);

    let streams = fetch_blood_glucose(&ctx).await.unwrap();

    assert_eq!(streams.hourly.len(), 4);
    assert_eq!(streams.average.len(), 4);
    assert_eq!(streams.uroc.len(), 4);
    assert_eq!(streams.percentages.len(), 2);
    assert!(streams.hourly[1].start_bg.is_none());
    assert!(streams.average[2].average_bg.is_none());
    assert!(streams.uroc[1].uroc.is_none());
    assert!(streams.uroc[0].uroc.is_some());
    assert_eq!(streams.percentages[1].start, base + Duration::hours(3));
}

#[tokio::test]
async fn test_glucose_buckets_stay_utc_aligned_in_local_zone() {
    let source = SyntheticHealthSource::new();
    add_readings(
        &source,
        QuantityMetric::BloodGlucose,
        at("2025-01-01T14:00:00Z"),
        at("2025-01-01T17:10:00Z"),
        |_| 140.0,
    );
    // Window opens mid-hour; New York is UTC-5 so local and UTC hours differ
    let ctx = context(
        source,
        at("2025-01-01T14:20:00Z"),
        at("2025-01-01T17:10:00Z"),
        Tz::America__New_York,
    );

    let streams = fetch_blood_glucose(&ctx).await.unwrap();

    let starts: Vec<DateTime<Utc>> = streams.hourly.iter().map(|record| record.start).collect();
    assert_eq!(
        starts,
        vec![
            at("2025-01-01T14:00:00Z"),
            at("2025-01-01T15:00:00Z"),
            at("2025-01-01T16:00:00Z"),
            at("2025-01-01T17:00:00Z"),
        ]
    );
    assert_eq!(streams.hourly[3].end, at("2025-01-01T17:10:00Z"));
    let percent_starts: Vec<DateTime<Utc>> =
        streams.percentages.iter().map(|record| record.start).collect();
    assert_eq!(percent_starts, starts);
    assert_eq!(streams.average.len(), 4);
}

#[tokio::test]
async fn test_glucose_fails_only_when_every_part_fails() {
    let source = SyntheticHealthSource::new();
    source.inject_failure(
        QuantityMetric::BloodGlucose,
        ProviderError::query_failed("synthetic", "blood_glucose", "locked"),
    );
    let base = at("2025-01-01T00:00:00Z");
    let ctx = context(source, base, base + Duration::hours(3), Tz::UTC);

    assert!(fetch_blood_glucose(&ctx).await.is_err());
}

#[tokio::test(start_paused = true)]
async fn test_per_hour_reads_respect_concurrency_bound() {
    let source = Arc::new(SyntheticHealthSource::new());
    let base = at("2025-01-01T00:00:00Z");
    add_readings(&source, QuantityMetric::BloodGlucose, base, base + Duration::hours(12), |_| 120.0);
    source.inject_latency(QuantityMetric::BloodGlucose, std::time::Duration::from_millis(50));
    init_test_logging();
    let mut ctx = FetchContext::new(source.clone(), base, base + Duration::hours(12), Tz::UTC);
    ctx.max_concurrent_queries = 3;

    let streams = fetch_blood_glucose(&ctx).await.unwrap();

    assert_eq!(streams.percentages.len(), 12);
    // Two statistics queries run beside the bounded per-hour reads
    assert!(source.peak_concurrency() <= 3 + 2);
    assert_eq!(source.query_count(), 12 + 2);
}

#[tokio::test]
async fn test_sleep_splits_at_local_midnight() {
    let source = SyntheticHealthSource::new();
    source.add_category_samples([
        // 23:00-00:30 Berlin time, started before the window's first day
        sleep("2025-01-09T22:00:00Z", "2025-01-09T23:30:00Z", SleepState::Awake),
        sleep("2025-01-10T20:30:00Z", "2025-01-11T01:30:00Z", SleepState::InBed),
        sleep("2025-01-10T21:00:00Z", "2025-01-11T01:00:00Z", SleepState::Core),
        sleep("2025-01-11T01:00:00Z", "2025-01-11T02:00:00Z", SleepState::Deep),
    ]);
    let ctx = context(
        source,
        at("2025-01-10T12:00:00Z"),
        at("2025-01-11T12:00:00Z"),
        Tz::Europe__Berlin,
    );

    let days = fetch_sleep(&ctx).await.unwrap();

    assert_eq!(days.len(), 2);
    assert_eq!(days[0].date.to_string(), "2025-01-10");
    assert_eq!(days[0].day_start, at("2025-01-09T23:00:00Z"));
    assert!((days[0].awake - 30.0).abs() < 1e-9);
    assert!((days[0].asleep_core - 120.0).abs() < 1e-9);
    assert!((days[1].asleep_core - 120.0).abs() < 1e-9);
    assert!((days[1].asleep_deep - 60.0).abs() < 1e-9);
    assert!((days[1].total_asleep() - 180.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_in_bed_only_day_is_skipped() {
    let source = SyntheticHealthSource::new();
    source.add_category_samples([sleep(
        "2025-01-10T22:00:00Z",
        "2025-01-11T06:00:00Z",
        SleepState::InBed,
    )]);
    let ctx = context(
        source,
        at("2025-01-10T12:00:00Z"),
        at("2025-01-11T12:00:00Z"),
        Tz::UTC,
    );

    assert!(fetch_sleep(&ctx).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_cycle_day_counts_from_start_inside_lookback() {
    let source = SyntheticHealthSource::new();
    source.add_category_samples([
        flow("2025-03-01", FlowLevel::Medium),
        flow("2025-03-02", FlowLevel::Light),
        flow("2025-03-03", FlowLevel::None),
    ]);
    let ctx = context(
        source,
        at("2025-04-30T12:00:00Z"),
        at("2025-05-02T12:00:00Z"),
        Tz::UTC,
    );

    let days = fetch_menstrual(&ctx).await.unwrap();

    let counts: Vec<i64> = days.iter().map(|day| day.days_since_period_start).collect();
    assert_eq!(counts, vec![60, 61, 62]);
}

#[tokio::test]
async fn test_cycle_day_unknown_beyond_lookback() {
    let source = SyntheticHealthSource::new();
    source.add_category_samples([flow("2025-01-15", FlowLevel::Heavy)]);
    let ctx = context(
        source,
        at("2025-04-30T12:00:00Z"),
        at("2025-05-01T12:00:00Z"),
        Tz::UTC,
    );

    let days = fetch_menstrual(&ctx).await.unwrap();

    assert_eq!(days.len(), 2);
    assert!(days.iter().all(|day| day.days_since_period_start == -1));
}

#[tokio::test]
async fn test_body_mass_skips_hours_without_weighing() {
    let source = SyntheticHealthSource::new();
    let base = at("2025-01-01T00:00:00Z");
    source.add_quantity_samples([
        QuantitySample::at(QuantityMetric::BodyMass, base + Duration::minutes(10), 70.0),
        QuantitySample::at(QuantityMetric::BodyMass, base + Duration::minutes(40), 71.0),
        QuantitySample::at(QuantityMetric::BodyMass, base + Duration::hours(3), 69.0),
    ]);
    let ctx = context(source, base, base + Duration::hours(5), Tz::UTC);

    let hours = fetch_body_mass(&ctx).await.unwrap();

    assert_eq!(hours.len(), 2);
    assert!((hours[0].weight - 70.5).abs() < 1e-9);
    assert_eq!(hours[1].hour, base + Duration::hours(3));
}
