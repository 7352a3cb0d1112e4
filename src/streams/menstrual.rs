// ABOUTME: Menstrual fetcher computing days since the latest period start for each local day
// ABOUTME: A period starts on a flow day whose previous local day had no flow
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::FetchContext;
use chrono::{Duration, NaiveDate};
use insite_core::models::DailyMenstrual;
use insite_core::time::local_date;
use insite_providers::{CategoryMetric, CategorySample, CategoryValue, ProviderResult};
use std::collections::BTreeSet;

/// How far before the window flow history is read
pub const CYCLE_LOOKBACK_DAYS: i64 = 90;

/// Reported when no period start precedes the day
pub const UNKNOWN_CYCLE_DAY: i64 = -1;

/// Fetch the cycle day for every local day of the window
///
/// # Errors
///
/// Returns the source error
pub async fn fetch_menstrual(ctx: &FetchContext) -> ProviderResult<Vec<DailyMenstrual>> {
    let days = ctx.days();
    let (Some(first), Some(last)) = (days.first(), days.last()) else {
        return Ok(Vec::new());
    };
    let samples = ctx
        .source
        .category_samples(
            CategoryMetric::MenstrualFlow,
            first.start - Duration::days(CYCLE_LOOKBACK_DAYS),
            last.end,
        )
        .await?;
    let starts = period_starts(&samples, ctx.tz);

    Ok(days
        .into_iter()
        .map(|day| DailyMenstrual {
            date: day.date,
            day_start: day.start,
            days_since_period_start: days_since_start(&starts, day.date),
            therapy_profile_id: None,
        })
        .collect())
}

/// First days of each run of consecutive flow days
#[must_use]
pub fn period_starts(samples: &[CategorySample], tz: chrono_tz::Tz) -> Vec<NaiveDate> {
    let flow_days: BTreeSet<NaiveDate> = samples
        .iter()
        .filter(|sample| matches!(sample.value, CategoryValue::Flow(level) if level.is_flow()))
        .map(|sample| local_date(sample.start, tz))
        .collect();
    flow_days
        .iter()
        .copied()
        .filter(|date| {
            !date
                .pred_opt()
                .is_some_and(|previous| flow_days.contains(&previous))
        })
        .collect()
}

/// Days from the latest start on or before `date`, or -1
#[must_use]
pub fn days_since_start(starts: &[NaiveDate], date: NaiveDate) -> i64 {
    let after = starts.partition_point(|start| *start <= date);
    after
        .checked_sub(1)
        .map_or(UNKNOWN_CYCLE_DAY, |index| (date - starts[index]).num_days())
}
