// ABOUTME: Sleep fetcher totalling minutes per sleep state for each local day
// ABOUTME: Intervals crossing local midnight are split between the days they touch
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::FetchContext;
use chrono::Duration;
use insite_core::models::DailySleepDurations;
use insite_core::time::LocalDay;
use insite_providers::{CategoryMetric, CategorySample, CategoryValue, ProviderResult, SleepState};

/// Sessions starting this long before the first day can still end inside it
const SESSION_LOOKBACK_HOURS: i64 = 24;

/// Fetch sleep minutes per local day; days with no sleep data are skipped
///
/// # Errors
///
/// Returns the source error
pub async fn fetch_sleep(ctx: &FetchContext) -> ProviderResult<Vec<DailySleepDurations>> {
    let days = ctx.days();
    let (Some(first), Some(last)) = (days.first(), days.last()) else {
        return Ok(Vec::new());
    };
    let samples = ctx
        .source
        .category_samples(
            CategoryMetric::SleepAnalysis,
            first.start - Duration::hours(SESSION_LOOKBACK_HOURS),
            last.end,
        )
        .await?;

    Ok(days
        .iter()
        .filter_map(|day| sleep_for_day(day, &samples))
        .collect())
}

/// Minutes of each state that fall inside `day`
#[must_use]
pub fn sleep_for_day(day: &LocalDay, samples: &[CategorySample]) -> Option<DailySleepDurations> {
    let mut record = DailySleepDurations {
        date: day.date,
        day_start: day.start,
        awake: 0.0,
        asleep_core: 0.0,
        asleep_deep: 0.0,
        asleep_rem: 0.0,
        asleep_unspecified: 0.0,
        therapy_profile_id: None,
    };
    let mut touched = false;

    for sample in samples {
        let CategoryValue::Sleep(state) = sample.value else {
            continue;
        };
        let start = sample.start.max(day.start);
        let end = sample.end.min(day.end);
        if end <= start {
            continue;
        }
        let minutes = (end - start).num_seconds() as f64 / 60.0;
        let slot = match state {
            SleepState::InBed => continue,
            SleepState::Awake => &mut record.awake,
            SleepState::Core => &mut record.asleep_core,
            SleepState::Deep => &mut record.asleep_deep,
            SleepState::Rem => &mut record.asleep_rem,
            SleepState::Unspecified => &mut record.asleep_unspecified,
        };
        *slot += minutes;
        touched = true;
    }

    touched.then_some(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use chrono_tz::Tz;
    use insite_providers::SyntheticHealthSource;
    use std::sync::Arc;

    fn at(text: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(text).unwrap().with_timezone(&Utc)
    }

    fn interval(start: &str, end: &str, state: SleepState) -> CategorySample {
        CategorySample {
            metric: CategoryMetric::SleepAnalysis,
            start: at(start),
            end: at(end),
            value: CategoryValue::Sleep(state),
        }
    }

    #[tokio::test]
    async fn test_split_across_midnight() {
        let source = SyntheticHealthSource::new();
        source.add_category_samples([
            interval("2025-01-01T23:00:00Z", "2025-01-02T01:00:00Z", SleepState::Core),
            interval("2025-01-02T01:00:00Z", "2025-01-02T01:30:00Z", SleepState::Rem),
            interval("2025-01-01T22:30:00Z", "2025-01-02T07:00:00Z", SleepState::InBed),
        ]);
        let ctx = FetchContext::new(
            Arc::new(source),
            at("2025-01-01T00:00:00Z"),
            at("2025-01-03T12:00:00Z"),
            Tz::UTC,
        );
        let days = fetch_sleep(&ctx).await.unwrap();
        assert_eq!(days.len(), 2);
        assert!((days[0].asleep_core - 60.0).abs() < 1e-9);
        assert!((days[1].asleep_core - 60.0).abs() < 1e-9);
        assert!((days[1].asleep_rem - 30.0).abs() < 1e-9);
        assert!((days[1].total_asleep() - 90.0).abs() < 1e-9);
    }
}
