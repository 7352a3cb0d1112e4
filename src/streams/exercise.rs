// ABOUTME: Exercise fetcher merging move and exercise minutes by hour and by local day
// ABOUTME: Daily values are per-hour averages of the day's totals
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::FetchContext;
use chrono::{DateTime, Utc};
use insite_core::constants::time::HOURS_PER_DAY;
use insite_core::models::{DailyAverageExercise, HourlyExercise};
use insite_providers::{BucketStatistic, ProviderResult, QuantityMetric};
use std::collections::BTreeMap;

/// Exercise records for one window
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExerciseStreams {
    /// Minutes per hour with activity
    pub hourly: Vec<HourlyExercise>,
    /// Per-hour averages per local day with activity
    pub daily_average: Vec<DailyAverageExercise>,
}

/// Join two bucket series on start time, keeping buckets where either has data
pub(crate) fn merge_sums(
    left: &[BucketStatistic],
    right: &[BucketStatistic],
) -> BTreeMap<DateTime<Utc>, (f64, f64)> {
    let mut merged: BTreeMap<DateTime<Utc>, (f64, f64)> = BTreeMap::new();
    for bucket in left.iter().filter(|bucket| bucket.has_data()) {
        merged.entry(bucket.start).or_default().0 += bucket.sum.unwrap_or(0.0);
    }
    for bucket in right.iter().filter(|bucket| bucket.has_data()) {
        merged.entry(bucket.start).or_default().1 += bucket.sum.unwrap_or(0.0);
    }
    merged
}

/// Fetch hourly and daily exercise minutes
///
/// # Errors
///
/// Returns the first source error
pub async fn fetch_exercise(ctx: &FetchContext) -> ProviderResult<ExerciseStreams> {
    let (move_hours, exercise_hours, move_days, exercise_days) = tokio::join!(
        ctx.hourly_statistics(QuantityMetric::MoveTime),
        ctx.hourly_statistics(QuantityMetric::ExerciseTime),
        ctx.daily_statistics(QuantityMetric::MoveTime),
        ctx.daily_statistics(QuantityMetric::ExerciseTime)
    );

    let hourly = merge_sums(&move_hours?, &exercise_hours?)
        .into_iter()
        .map(|(hour, (move_minutes, exercise_minutes))| HourlyExercise {
            hour,
            move_minutes,
            exercise_minutes,
            total_minutes: move_minutes + exercise_minutes,
            therapy_profile_id: None,
        })
        .collect();

    let move_days = move_days?;
    let exercise_days = exercise_days?;
    let move_buckets: Vec<BucketStatistic> = move_days.iter().map(|(_, bucket)| *bucket).collect();
    let exercise_buckets: Vec<BucketStatistic> =
        exercise_days.iter().map(|(_, bucket)| *bucket).collect();
    let days: BTreeMap<DateTime<Utc>, _> = move_days
        .iter()
        .chain(exercise_days.iter())
        .map(|(day, _)| (day.start, *day))
        .collect();

    let hours = f64::from(HOURS_PER_DAY);
    let daily_average = merge_sums(&move_buckets, &exercise_buckets)
        .into_iter()
        .filter_map(|(start, (move_total, exercise_total))| {
            let day = days.get(&start)?;
            let average_move_minutes = move_total / hours;
            let average_exercise_minutes = exercise_total / hours;
            Some(DailyAverageExercise {
                date: day.date,
                day_start: day.start,
                average_move_minutes,
                average_exercise_minutes,
                average_total_minutes: average_move_minutes + average_exercise_minutes,
                therapy_profile_id: None,
            })
        })
        .collect();

    Ok(ExerciseStreams {
        hourly,
        daily_average,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use chrono_tz::Tz;
    use insite_providers::{QuantitySample, SyntheticHealthSource};
    use std::sync::Arc;

    fn at(text: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(text).unwrap().with_timezone(&Utc)
    }

    #[tokio::test]
    async fn test_hours_merge_and_daily_divides_by_24() {
        let source = SyntheticHealthSource::new();
        let base = at("2025-01-01T08:00:00Z");
        source.add_quantity_samples([
            QuantitySample::at(QuantityMetric::MoveTime, base, 12.0),
            QuantitySample::at(QuantityMetric::MoveTime, base + Duration::minutes(30), 12.0),
            QuantitySample::at(QuantityMetric::ExerciseTime, base + Duration::minutes(10), 6.0),
            QuantitySample::at(QuantityMetric::ExerciseTime, base + Duration::hours(3), 18.0),
        ]);
        let ctx = FetchContext::new(
            Arc::new(source),
            at("2025-01-01T00:00:00Z"),
            at("2025-01-01T20:00:00Z"),
            Tz::UTC,
        );
        let streams = fetch_exercise(&ctx).await.unwrap();
        assert_eq!(streams.hourly.len(), 2);
        assert!((streams.hourly[0].total_minutes - 30.0).abs() < 1e-9);
        assert!((streams.hourly[1].move_minutes).abs() < 1e-9);

        assert_eq!(streams.daily_average.len(), 1);
        let day = &streams.daily_average[0];
        assert!((day.average_move_minutes - 1.0).abs() < 1e-9);
        assert!((day.average_exercise_minutes - 1.0).abs() < 1e-9);
        assert!((day.average_total_minutes - 2.0).abs() < 1e-9);
    }
}
