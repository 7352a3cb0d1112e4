// ABOUTME: Body mass fetcher producing the mean weight of each hour with a measurement
// ABOUTME: Hours without a measurement are skipped
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::{with_data, FetchContext};
use insite_core::models::HourlyBodyMass;
use insite_providers::{ProviderResult, QuantityMetric};

/// Fetch hourly body mass
///
/// # Errors
///
/// Returns the source error
pub async fn fetch_body_mass(ctx: &FetchContext) -> ProviderResult<Vec<HourlyBodyMass>> {
    let buckets = ctx.hourly_statistics(QuantityMetric::BodyMass).await?;
    Ok(with_data(&buckets, |bucket| bucket.average)
        .into_iter()
        .map(|(hour, weight)| HourlyBodyMass {
            hour,
            weight,
            therapy_profile_id: None,
        })
        .collect())
}
