// ABOUTME: Resting heart rate fetcher producing one mean value per local day with data
// ABOUTME: Days run from local midnight to local midnight in the configured zone
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::FetchContext;
use insite_core::models::DailyRestingHeartRate;
use insite_providers::{ProviderResult, QuantityMetric};

/// Fetch daily resting heart rate
///
/// # Errors
///
/// Returns the source error
pub async fn fetch_resting_heart_rate(ctx: &FetchContext) -> ProviderResult<Vec<DailyRestingHeartRate>> {
    let days = ctx.daily_statistics(QuantityMetric::RestingHeartRate).await?;
    Ok(days
        .into_iter()
        .filter_map(|(day, bucket)| {
            bucket.average.map(|resting_heart_rate| DailyRestingHeartRate {
                date: day.date,
                day_start: day.start,
                resting_heart_rate,
                therapy_profile_id: None,
            })
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, Utc};
    use chrono_tz::Tz;
    use insite_providers::{QuantitySample, SyntheticHealthSource};
    use std::sync::Arc;

    fn at(text: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(text).unwrap().with_timezone(&Utc)
    }

    #[tokio::test]
    async fn test_days_follow_local_midnight() {
        let source = SyntheticHealthSource::new();
        // 03:00 UTC on the 2nd is still the 1st in New York
        source.add_quantity_samples([
            QuantitySample::at(QuantityMetric::RestingHeartRate, at("2025-01-02T03:00:00Z"), 55.0),
            QuantitySample::at(QuantityMetric::RestingHeartRate, at("2025-01-02T15:00:00Z"), 61.0),
        ]);
        let ctx = FetchContext::new(
            Arc::new(source),
            at("2025-01-01T12:00:00Z"),
            at("2025-01-02T20:00:00Z"),
            Tz::America__New_York,
        );
        let days = fetch_resting_heart_rate(&ctx).await.unwrap();
        assert_eq!(days.len(), 2);
        assert_eq!(days[0].date.to_string(), "2025-01-01");
        assert!((days[0].resting_heart_rate - 55.0).abs() < 1e-9);
        assert_eq!(days[1].day_start, at("2025-01-02T05:00:00Z"));
        assert!(days[1].day_start - days[0].day_start == Duration::days(1));
    }
}
