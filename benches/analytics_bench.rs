// ABOUTME: Criterion benchmarks for glucose analytics and therapy backfill
// ABOUTME: Measures uROC scoring across regimes and as-of hour resolution over long windows
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Criterion benchmarks for the sync pipeline's pure computations.
//!
//! Covers the uROC estimator in each glucose regime, whole-window uROC
//! scoring, and the hourly therapy backfill across profile switches.

#![allow(clippy::missing_docs_in_private_items, missing_docs)]

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use insite_analytics::{compute_hourly_uroc, URocCalculator};
use insite_core::models::{HourRange, HourlyBgData, TherapyProfile, TherapySnapshot};
use insite_sync::therapy::{backfill_hours, SnapshotTimeline};

const TARGET_BG: f64 = 110.0;

fn base() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
        .map(|instant| instant.with_timezone(&Utc))
        .unwrap_or_default()
}

/// Hourly buckets with a wave of readings and every tenth hour empty
#[allow(clippy::cast_precision_loss)]
fn generate_hours(count: i64) -> Vec<HourlyBgData> {
    (0..count)
        .map(|index| {
            let start = base() + Duration::hours(index);
            let level = 140.0 + 60.0 * ((index as f64) / 5.0).sin();
            let has_data = index % 10 != 9;
            HourlyBgData {
                start,
                end: start + Duration::hours(1),
                start_bg: has_data.then_some(level),
                end_bg: has_data.then_some(level + 8.0),
                therapy_profile_id: None,
            }
        })
        .collect()
}

/// Timeline with a profile switch every `switch_every_hours`
fn generate_timeline(days: i64, switch_every_hours: i64) -> SnapshotTimeline {
    let day = TherapyProfile::new(
        "Day",
        vec![
            HourRange::new(6, 21, 10.0, 0.9, 40.0),
            HourRange::new(22, 5, 14.0, 0.6, 55.0),
        ],
    );
    let sick = TherapyProfile::new("Sick", vec![HourRange::new(0, 23, 8.0, 1.2, 35.0)]);
    let snapshots = (0..days * 24 / switch_every_hours)
        .map(|index| {
            let profile = if index % 2 == 0 { &day } else { &sick };
            TherapySnapshot::capture(profile, base() + Duration::hours(index * switch_every_hours))
        })
        .collect();
    SnapshotTimeline::new(snapshots)
}

fn bench_uroc_regimes(c: &mut Criterion) {
    let mut group = c.benchmark_group("uroc_estimate");
    let calculator = URocCalculator::new(TARGET_BG);

    for (name, start_bg, end_bg) in [
        ("hyperglycemic", 220.0, 205.0),
        ("hypoglycemic", 60.0, 68.0),
        ("at_target", TARGET_BG, TARGET_BG),
    ] {
        group.bench_function(name, |b| {
            b.iter(|| {
                calculator.estimate(
                    black_box(start_bg),
                    black_box(end_bg),
                    black_box(3_600.0),
                )
            });
        });
    }

    group.finish();
}

#[allow(clippy::cast_sign_loss)]
fn bench_window_uroc(c: &mut Criterion) {
    let mut group = c.benchmark_group("compute_hourly_uroc");

    for hours in [24_i64, 24 * 7, 24 * 30] {
        let samples = generate_hours(hours);
        group.throughput(Throughput::Elements(hours as u64));
        group.bench_with_input(BenchmarkId::from_parameter(hours), &samples, |b, samples| {
            b.iter(|| compute_hourly_uroc(black_box(samples), black_box(TARGET_BG)));
        });
    }

    group.finish();
}

#[allow(clippy::cast_sign_loss)]
fn bench_backfill(c: &mut Criterion) {
    let mut group = c.benchmark_group("backfill_hours");

    for days in [1_i64, 7, 31] {
        let timeline = generate_timeline(days, 12);
        let end = base() + Duration::days(days);
        group.throughput(Throughput::Elements((days * 24) as u64));
        group.bench_with_input(BenchmarkId::new("new_york", days), &timeline, |b, timeline| {
            b.iter(|| {
                backfill_hours(
                    black_box(timeline),
                    black_box(base()),
                    black_box(end),
                    Tz::America__New_York,
                )
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_uroc_regimes, bench_window_uroc, bench_backfill);
criterion_main!(benches);
