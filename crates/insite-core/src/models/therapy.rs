// ABOUTME: Therapy configuration models and the wraparound hour-range resolver
// ABOUTME: HourRange, TherapyProfile, TherapySnapshot, TherapyHour, and resolve_hour_range
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::therapy::{
    DEFAULT_BASAL_RATE, DEFAULT_CARB_RATIO, DEFAULT_INSULIN_SENSITIVITY, DEFAULT_PROFILE_NAME,
};
use crate::errors::{AppError, AppResult};

/// Settings that apply to a time-of-day span.
///
/// `start_hour <= end_hour` is a same-day span; `start_hour > end_hour` wraps
/// past midnight (22 to 5 covers 22, 23, 0, ..., 5). Both ends are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HourRange {
    /// First covered hour, 0-23
    pub start_hour: u8,
    /// Last covered hour, 0-23
    pub end_hour: u8,
    /// Grams of carbohydrate per unit of insulin
    pub carb_ratio: f64,
    /// Basal insulin units per hour
    pub basal_rate: f64,
    /// mg/dL drop per unit of insulin
    pub insulin_sensitivity: f64,
}

impl HourRange {
    /// Build a range
    #[must_use]
    pub const fn new(
        start_hour: u8,
        end_hour: u8,
        carb_ratio: f64,
        basal_rate: f64,
        insulin_sensitivity: f64,
    ) -> Self {
        Self {
            start_hour,
            end_hour,
            carb_ratio,
            basal_rate,
            insulin_sensitivity,
        }
    }

    /// Whether the range crosses midnight
    #[must_use]
    pub const fn is_wraparound(&self) -> bool {
        self.start_hour > self.end_hour
    }

    /// Whether local hour `hour` falls inside the range
    #[must_use]
    pub const fn contains(&self, hour: u8) -> bool {
        if self.is_wraparound() {
            hour >= self.start_hour || hour <= self.end_hour
        } else {
            self.start_hour <= hour && hour <= self.end_hour
        }
    }

    /// Number of hours covered, always in `1..=24` for valid hours
    #[must_use]
    pub const fn span(&self) -> u8 {
        if self.is_wraparound() {
            24u8.saturating_sub(self.start_hour)
                .saturating_add(self.end_hour)
                .saturating_add(1)
        } else {
            (self.end_hour - self.start_hour).saturating_add(1)
        }
    }

    /// Whether two ranges share at least one hour
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        (0..24).any(|hour| self.contains(hour) && other.contains(hour))
    }

    /// Check hour bounds and therapy values
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` when an hour is outside 0-23, the carb ratio or
    /// insulin sensitivity is not positive, or the basal rate is negative.
    pub fn validate(&self) -> AppResult<()> {
        if self.start_hour > 23 || self.end_hour > 23 {
            return Err(AppError::invalid_input(format!(
                "hour range {}-{} must use hours 0-23",
                self.start_hour, self.end_hour
            )));
        }
        if !(self.carb_ratio.is_finite() && self.carb_ratio > 0.0) {
            return Err(AppError::invalid_input("carb ratio must be positive"));
        }
        if !(self.insulin_sensitivity.is_finite() && self.insulin_sensitivity > 0.0) {
            return Err(AppError::invalid_input(
                "insulin sensitivity must be positive",
            ));
        }
        if !(self.basal_rate.is_finite() && self.basal_rate >= 0.0) {
            return Err(AppError::invalid_input("basal rate must not be negative"));
        }
        Ok(())
    }
}

/// Pick the range that applies to `hour`.
///
/// Overlapping ranges are tolerated here: the narrowest match wins and ties go
/// to the earliest range in `ranges`.
#[must_use]
pub fn resolve_hour_range(hour: u8, ranges: &[HourRange]) -> Option<&HourRange> {
    ranges
        .iter()
        .filter(|range| range.contains(hour))
        .fold(None, |best: Option<&HourRange>, candidate| match best {
            Some(current) if current.span() <= candidate.span() => Some(current),
            _ => Some(candidate),
        })
}

/// A named set of hour ranges the user can activate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TherapyProfile {
    /// Stable profile identifier
    pub id: Uuid,
    /// Display name, unique within a profile store
    pub name: String,
    /// Ranges in user-entered order
    pub hour_ranges: Vec<HourRange>,
}

impl TherapyProfile {
    /// Create a profile with a fresh identifier
    #[must_use]
    pub fn new(name: impl Into<String>, hour_ranges: Vec<HourRange>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            hour_ranges,
        }
    }

    /// Built-in profile covering the whole day with conservative values
    #[must_use]
    pub fn default_profile() -> Self {
        Self::new(
            DEFAULT_PROFILE_NAME,
            vec![HourRange::new(
                0,
                23,
                DEFAULT_CARB_RATIO,
                DEFAULT_BASAL_RATE,
                DEFAULT_INSULIN_SENSITIVITY,
            )],
        )
    }

    /// Validate every range and reject overlaps
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for an empty name, an invalid range, or two
    /// ranges that share an hour.
    pub fn validate(&self) -> AppResult<()> {
        if self.name.trim().is_empty() {
            return Err(AppError::invalid_input("profile name must not be empty"));
        }
        for range in &self.hour_ranges {
            range.validate()?;
        }
        for (index, range) in self.hour_ranges.iter().enumerate() {
            if let Some(other) = self.hour_ranges[index + 1..]
                .iter()
                .find(|other| range.overlaps(other))
            {
                return Err(AppError::invalid_input(format!(
                    "hour ranges {}-{} and {}-{} overlap in profile '{}'",
                    range.start_hour, range.end_hour, other.start_hour, other.end_hour, self.name
                )));
            }
        }
        Ok(())
    }
}

/// Immutable record of the configuration that became active at `timestamp`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TherapySnapshot {
    /// Snapshot identifier, also its document ID in the remote log
    pub id: Uuid,
    /// Instant the configuration took effect
    pub timestamp: DateTime<Utc>,
    /// Profile that was activated
    pub profile_id: Uuid,
    /// Profile name at activation time
    pub profile_name: String,
    /// Ranges at activation time
    pub hour_ranges: Vec<HourRange>,
}

impl TherapySnapshot {
    /// Capture `profile` as effective from `timestamp`
    #[must_use]
    pub fn capture(profile: &TherapyProfile, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp,
            profile_id: profile.id,
            profile_name: profile.name.clone(),
            hour_ranges: profile.hour_ranges.clone(),
        }
    }
}

/// Settings resolved for one UTC hour bucket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TherapyHour {
    /// UTC hour bucket start
    pub hour_start_utc: DateTime<Utc>,
    /// Active profile
    pub profile_id: Uuid,
    /// Active profile name
    pub profile_name: String,
    /// Effective time of the snapshot that supplied the settings
    pub snapshot_timestamp: DateTime<Utc>,
    /// Resolved carb ratio
    pub carb_ratio: f64,
    /// Resolved basal rate
    pub basal_rate: f64,
    /// Resolved insulin sensitivity
    pub insulin_sensitivity: f64,
    /// IANA zone used for the local hour
    pub local_tz: String,
    /// Local hour the range was resolved for
    pub local_hour: u8,
}
