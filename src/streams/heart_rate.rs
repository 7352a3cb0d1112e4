// ABOUTME: Heart rate fetcher producing hourly averages and a trailing seven-day daily average
// ABOUTME: Daily values average the per-day means of the week ending on each local day
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::{with_data, FetchContext};
use insite_analytics::mean;
use insite_core::constants::time::TRAILING_AVERAGE_DAYS;
use insite_core::models::{DailyAverageHeartRate, HourlyHeartRate};
use insite_providers::{ProviderResult, QuantityMetric};

/// Heart rate records for one window
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeartRateStreams {
    /// Mean heart rate per hour with readings
    pub hourly: Vec<HourlyHeartRate>,
    /// Trailing weekly average per local day
    pub daily_average: Vec<DailyAverageHeartRate>,
}

/// Fetch hourly and trailing daily heart rate
///
/// # Errors
///
/// Returns the first source error
pub async fn fetch_heart_rate(ctx: &FetchContext) -> ProviderResult<HeartRateStreams> {
    let (hourly, trailing) = tokio::join!(
        ctx.hourly_statistics(QuantityMetric::HeartRate),
        ctx.trailing_daily_statistics(QuantityMetric::HeartRate, TRAILING_AVERAGE_DAYS)
    );

    let hourly = with_data(&hourly?, |bucket| bucket.average)
        .into_iter()
        .map(|(hour, heart_rate)| HourlyHeartRate {
            hour,
            heart_rate,
            therapy_profile_id: None,
        })
        .collect();

    let daily_average = trailing?
        .into_iter()
        .filter_map(|(day, buckets)| {
            let daily_means: Vec<f64> = buckets.iter().filter_map(|bucket| bucket.average).collect();
            mean(&daily_means).map(|average_heart_rate| DailyAverageHeartRate {
                date: day.date,
                day_start: day.start,
                average_heart_rate,
                therapy_profile_id: None,
            })
        })
        .collect();

    Ok(HeartRateStreams {
        hourly,
        daily_average,
    })
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
    async fn test_daily_average_is_mean_of_daily_means() {
        let source = SyntheticHealthSource::new();
        let base = at("2025-01-01T10:00:00Z");
        // Day 1 mean 60, day 2 mean 80 (from 70 and 90)
        source.add_quantity_samples([
            QuantitySample::at(QuantityMetric::HeartRate, base, 60.0),
            QuantitySample::at(QuantityMetric::HeartRate, base + Duration::days(1), 70.0),
            QuantitySample::at(QuantityMetric::HeartRate, base + Duration::days(1) + Duration::hours(1), 90.0),
        ]);
        let ctx = FetchContext::new(
            Arc::new(source),
            at("2025-01-02T00:00:00Z"),
            at("2025-01-02T23:00:00Z"),
            Tz::UTC,
        );
        let streams = fetch_heart_rate(&ctx).await.unwrap();
        assert_eq!(streams.hourly.len(), 2);
        assert_eq!(streams.daily_average.len(), 1);
        assert!((streams.daily_average[0].average_heart_rate - 70.0).abs() < 1e-9);
    }
}
