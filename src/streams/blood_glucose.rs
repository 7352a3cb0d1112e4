// ABOUTME: Blood glucose fetcher with three concurrent sub-branches and derived uROC
// ABOUTME: Percent low/high fans out per hour into a single aggregation task
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Blood Glucose
//!
//! Three sub-branches run concurrently:
//!
//! - **start/end**: hourly first and last reading, one record per bucket
//! - **average**: hourly mean, one record per bucket, absent value for gaps
//! - **percentages**: raw readings per hour fetched with bounded concurrency,
//!   aggregated by one task that owns the index-addressed accumulator
//!
//! uROC is derived from the start/end records. A failed sub-branch contributes
//! nothing and is logged; the fetch only fails when every sub-branch failed.

use super::FetchContext;
use chrono::{DateTime, Utc};
use insite_analytics::{compute_hourly_uroc, GlycemicThresholds};
use insite_core::models::{HourlyAvgBgData, HourlyBgData, HourlyBgPercentages, HourlyBgURoc};
use insite_core::time::hour_buckets;
use insite_providers::{HealthDataSource, ProviderError, ProviderResult, QuantityMetric};
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// Glucose records for one window
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BloodGlucoseStreams {
    /// First and last reading per hour
    pub hourly: Vec<HourlyBgData>,
    /// Mean reading per hour
    pub average: Vec<HourlyAvgBgData>,
    /// Percent low/high per hour with readings
    pub percentages: Vec<HourlyBgPercentages>,
    /// Unexpected rate of change per hour
    pub uroc: Vec<HourlyBgURoc>,
}

impl BloodGlucoseStreams {
    /// Records across every glucose stream
    #[must_use]
    pub fn record_count(&self) -> usize {
        self.hourly.len() + self.average.len() + self.percentages.len() + self.uroc.len()
    }
}

/// Fetch every glucose stream for the window
///
/// # Errors
///
/// Returns the start/end error when all three sub-branches failed
pub async fn fetch_blood_glucose(ctx: &FetchContext) -> ProviderResult<BloodGlucoseStreams> {
    let (hourly, average, percentages) = tokio::join!(
        fetch_start_end(ctx),
        fetch_average(ctx),
        fetch_percentages(ctx)
    );

    if let (Err(e), Err(_), Err(_)) = (&hourly, &average, &percentages) {
        return Err(e.clone());
    }

    let hourly = part("start_end", hourly);
    let average = part("average", average);
    let percentages = part("percentages", percentages);
    let uroc = compute_hourly_uroc(&hourly, ctx.target_bg);

    Ok(BloodGlucoseStreams {
        hourly,
        average,
        percentages,
        uroc,
    })
}

fn part<T>(name: &str, result: ProviderResult<Vec<T>>) -> Vec<T> {
    result.unwrap_or_else(|e| {
        warn!(sync.branch = "blood_glucose", sync.part = name, error = %e, "glucose sub-branch failed");
        Vec::new()
    })
}

async fn fetch_start_end(ctx: &FetchContext) -> ProviderResult<Vec<HourlyBgData>> {
    let buckets = ctx.hourly_statistics(QuantityMetric::BloodGlucose).await?;
    Ok(buckets
        .into_iter()
        .map(|bucket| HourlyBgData {
            start: bucket.start,
            end: bucket.end,
            start_bg: bucket.first,
            end_bg: bucket.last,
            therapy_profile_id: None,
        })
        .collect())
}

async fn fetch_average(ctx: &FetchContext) -> ProviderResult<Vec<HourlyAvgBgData>> {
    let buckets = ctx.hourly_statistics(QuantityMetric::BloodGlucose).await?;
    Ok(buckets
        .into_iter()
        .map(|bucket| HourlyAvgBgData {
            start: bucket.start,
            end: bucket.end,
            average_bg: bucket.average,
            therapy_profile_id: None,
        })
        .collect())
}

/// One hour's readings, or the error that stopped its query
type HourReadings = (usize, ProviderResult<Vec<f64>>);

async fn fetch_percentages(ctx: &FetchContext) -> ProviderResult<Vec<HourlyBgPercentages>> {
    let bins: Vec<(DateTime<Utc>, DateTime<Utc>)> = hour_buckets(ctx.hourly_start(), ctx.window_end)
        .into_iter()
        .map(|start| (start, (start + chrono::Duration::hours(1)).min(ctx.window_end)))
        .collect();
    if bins.is_empty() {
        return Ok(Vec::new());
    }

    let (tx, rx) = mpsc::channel::<HourReadings>(ctx.concurrency());
    let aggregator = tokio::spawn(aggregate_percentages(rx, bins.clone(), ctx.thresholds));

    let semaphore = Arc::new(Semaphore::new(ctx.concurrency()));
    let mut queries = JoinSet::new();
    for (index, (start, end)) in bins.iter().copied().enumerate() {
        let source: Arc<dyn HealthDataSource> = Arc::clone(&ctx.source);
        let semaphore = Arc::clone(&semaphore);
        let tx = tx.clone();
        queries.spawn(async move {
            let Ok(_permit) = semaphore.acquire_owned().await else {
                return;
            };
            let readings = source
                .quantity_samples(QuantityMetric::BloodGlucose, start, end)
                .await
                .map(|samples| samples.into_iter().map(|sample| sample.value).collect());
            // The aggregator only stops once every sender is dropped
            let _ = tx.send((index, readings)).await;
        });
    }
    drop(tx);

    while let Some(joined) = queries.join_next().await {
        if let Err(e) = joined {
            warn!(error = %e, "glucose hour query task aborted");
        }
    }

    aggregator.await.map_err(|e| {
        ProviderError::query_failed(ctx.source.name(), QuantityMetric::BloodGlucose.as_str(), e.to_string())
    })?
}

/// Owns the per-hour accumulator; the only writer to it
async fn aggregate_percentages(
    mut rx: mpsc::Receiver<HourReadings>,
    bins: Vec<(DateTime<Utc>, DateTime<Utc>)>,
    thresholds: GlycemicThresholds,
) -> ProviderResult<Vec<HourlyBgPercentages>> {
    let mut slots: Vec<Option<HourlyBgPercentages>> = vec![None; bins.len()];
    let mut failures = 0usize;
    let mut last_error = None;

    while let Some((index, readings)) = rx.recv().await {
        match readings {
            Ok(readings) => {
                let Some((percent_low, percent_high)) = thresholds.percent_low_high(&readings) else {
                    continue;
                };
                let (start, end) = bins[index];
                slots[index] = Some(HourlyBgPercentages {
                    start,
                    end,
                    percent_low,
                    percent_high,
                    therapy_profile_id: None,
                });
            }
            Err(e) => {
                failures += 1;
                debug!(hour = index, error = %e, "glucose hour query failed");
                last_error = Some(e);
            }
        }
    }

    if failures > 0 {
        warn!(failed_hours = failures, total_hours = bins.len(), "some glucose hours could not be read");
    }
    if let Some(e) = last_error.filter(|_| failures == bins.len()) {
        return Err(e);
    }
    Ok(slots.into_iter().flatten().collect())
}
