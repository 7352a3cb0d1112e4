// ABOUTME: Energy fetcher merging basal and active kcal by hour plus a trailing active average
// ABOUTME: The daily value is the week's active kcal divided by seven
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::exercise::merge_sums;
use super::FetchContext;
use insite_core::constants::time::TRAILING_AVERAGE_DAYS;
use insite_core::models::{DailyAverageEnergy, HourlyEnergy};
use insite_providers::{ProviderResult, QuantityMetric};

/// Energy records for one window
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnergyStreams {
    /// kcal per hour with data
    pub hourly: Vec<HourlyEnergy>,
    /// Trailing weekly active kcal per local day
    pub daily_average: Vec<DailyAverageEnergy>,
}

/// Fetch hourly energy and the trailing active average
///
/// # Errors
///
/// Returns the first source error
#[allow(clippy::cast_precision_loss)]
pub async fn fetch_energy(ctx: &FetchContext) -> ProviderResult<EnergyStreams> {
    let (basal, active, trailing) = tokio::join!(
        ctx.hourly_statistics(QuantityMetric::BasalEnergy),
        ctx.hourly_statistics(QuantityMetric::ActiveEnergy),
        ctx.trailing_daily_statistics(QuantityMetric::ActiveEnergy, TRAILING_AVERAGE_DAYS)
    );

    let hourly = merge_sums(&basal?, &active?)
        .into_iter()
        .map(|(hour, (basal_energy, active_energy))| HourlyEnergy {
            hour,
            basal_energy,
            active_energy,
            total_energy: basal_energy + active_energy,
            therapy_profile_id: None,
        })
        .collect();

    let daily_average = trailing?
        .into_iter()
        .filter_map(|(day, buckets)| {
            let with_data: Vec<f64> = buckets.iter().filter_map(|bucket| bucket.sum).collect();
            if with_data.is_empty() {
                return None;
            }
            Some(DailyAverageEnergy {
                date: day.date,
                day_start: day.start,
                average_active_energy: with_data.iter().sum::<f64>() / TRAILING_AVERAGE_DAYS as f64,
                therapy_profile_id: None,
            })
        })
        .collect();

    Ok(EnergyStreams {
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
    async fn test_trailing_active_divides_by_seven() {
        let source = SyntheticHealthSource::new();
        let base = at("2025-01-05T09:00:00Z");
        source.add_quantity_samples([
            QuantitySample::at(QuantityMetric::ActiveEnergy, base - Duration::days(3), 300.0),
            QuantitySample::at(QuantityMetric::ActiveEnergy, base, 400.0),
            QuantitySample::at(QuantityMetric::BasalEnergy, base, 70.0),
        ]);
        let ctx = FetchContext::new(
            Arc::new(source),
            at("2025-01-05T00:00:00Z"),
            at("2025-01-05T12:00:00Z"),
            Tz::UTC,
        );
        let streams = fetch_energy(&ctx).await.unwrap();
        assert_eq!(streams.hourly.len(), 1);
        assert!((streams.hourly[0].total_energy - 470.0).abs() < 1e-9);
        assert_eq!(streams.daily_average.len(), 1);
        assert!((streams.daily_average[0].average_active_energy - 100.0).abs() < 1e-9);
    }
}
