// ABOUTME: Time-bucketed metric records produced by the stream fetchers
// ABOUTME: Hourly and daily shapes for glucose, heart rate, energy, exercise, sleep, and more
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Metric records.
//!
//! Every record carries its bucket start as a UTC instant so the sync pass can
//! attach the therapy profile that was active when the bucket began. Daily
//! records also keep their local calendar date.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A record that can be tagged with the therapy profile active at its bucket start
pub trait ProfileTagged {
    /// UTC instant the bucket begins
    fn bucket_start(&self) -> DateTime<Utc>;
    /// Currently attached profile, if any
    fn therapy_profile_id(&self) -> Option<Uuid>;
    /// Attach or clear the profile
    fn set_therapy_profile_id(&mut self, profile_id: Option<Uuid>);
}

macro_rules! impl_profile_tagged {
    ($record:ty, $start:ident) => {
        impl ProfileTagged for $record {
            fn bucket_start(&self) -> DateTime<Utc> {
                self.$start
            }

            fn therapy_profile_id(&self) -> Option<Uuid> {
                self.therapy_profile_id
            }

            fn set_therapy_profile_id(&mut self, profile_id: Option<Uuid>) {
                self.therapy_profile_id = profile_id;
            }
        }
    };
}

/// First and last glucose reading of an hour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HourlyBgData {
    /// Bucket start
    pub start: DateTime<Utc>,
    /// Bucket end
    pub end: DateTime<Utc>,
    /// First reading in the bucket
    pub start_bg: Option<f64>,
    /// Last reading in the bucket
    pub end_bg: Option<f64>,
    /// Profile active at `start`
    pub therapy_profile_id: Option<Uuid>,
}

/// Mean glucose of an hour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HourlyAvgBgData {
    /// Bucket start
    pub start: DateTime<Utc>,
    /// Bucket end
    pub end: DateTime<Utc>,
    /// Mean reading, absent for empty hours
    pub average_bg: Option<f64>,
    /// Profile active at `start`
    pub therapy_profile_id: Option<Uuid>,
}

/// Share of readings below the low and above the high threshold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HourlyBgPercentages {
    /// Bucket start
    pub start: DateTime<Utc>,
    /// Bucket end
    pub end: DateTime<Utc>,
    /// Percentage (0-100) of readings strictly below the low threshold
    pub percent_low: f64,
    /// Percentage (0-100) of readings strictly above the high threshold
    pub percent_high: f64,
    /// Profile active at `start`
    pub therapy_profile_id: Option<Uuid>,
}

/// Unexpected rate of change for an hour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HourlyBgURoc {
    /// Bucket start
    pub start: DateTime<Utc>,
    /// Bucket end
    pub end: DateTime<Utc>,
    /// Observed minus modelled rate in mg/dL per second; absent for gaps
    pub uroc: Option<f64>,
    /// Modelled glucose at bucket end; absent for gaps or when unsolved
    pub expected_end_bg: Option<f64>,
    /// Profile active at `start`
    pub therapy_profile_id: Option<Uuid>,
}

/// Mean heart rate of an hour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HourlyHeartRate {
    /// Bucket start
    pub hour: DateTime<Utc>,
    /// Beats per minute
    pub heart_rate: f64,
    /// Profile active at `hour`
    pub therapy_profile_id: Option<Uuid>,
}

/// Trailing seven-day average heart rate for a local day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyAverageHeartRate {
    /// Local calendar date
    pub date: NaiveDate,
    /// UTC instant of local midnight
    pub day_start: DateTime<Utc>,
    /// Mean of the daily averages over the trailing week
    pub average_heart_rate: f64,
    /// Profile active at `day_start`
    pub therapy_profile_id: Option<Uuid>,
}

/// Move and exercise minutes of an hour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HourlyExercise {
    /// Bucket start
    pub hour: DateTime<Utc>,
    /// Move minutes
    pub move_minutes: f64,
    /// Exercise minutes
    pub exercise_minutes: f64,
    /// Move plus exercise
    pub total_minutes: f64,
    /// Profile active at `hour`
    pub therapy_profile_id: Option<Uuid>,
}

/// Per-hour averages of exercise minutes over a local day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyAverageExercise {
    /// Local calendar date
    pub date: NaiveDate,
    /// UTC instant of local midnight
    pub day_start: DateTime<Utc>,
    /// Move minutes per hour
    pub average_move_minutes: f64,
    /// Exercise minutes per hour
    pub average_exercise_minutes: f64,
    /// Sum of the two averages
    pub average_total_minutes: f64,
    /// Profile active at `day_start`
    pub therapy_profile_id: Option<Uuid>,
}

/// Basal and active energy of an hour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HourlyEnergy {
    /// Bucket start
    pub hour: DateTime<Utc>,
    /// Basal kcal
    pub basal_energy: f64,
    /// Active kcal
    pub active_energy: f64,
    /// Basal plus active
    pub total_energy: f64,
    /// Profile active at `hour`
    pub therapy_profile_id: Option<Uuid>,
}

/// Trailing seven-day active energy average for a local day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyAverageEnergy {
    /// Local calendar date
    pub date: NaiveDate,
    /// UTC instant of local midnight
    pub day_start: DateTime<Utc>,
    /// Active kcal per day over the trailing week
    pub average_active_energy: f64,
    /// Profile active at `day_start`
    pub therapy_profile_id: Option<Uuid>,
}

/// Mean body mass recorded in an hour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HourlyBodyMass {
    /// Bucket start
    pub hour: DateTime<Utc>,
    /// Kilograms
    pub weight: f64,
    /// Profile active at `hour`
    pub therapy_profile_id: Option<Uuid>,
}

/// Mean resting heart rate for a local day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyRestingHeartRate {
    /// Local calendar date
    pub date: NaiveDate,
    /// UTC instant of local midnight
    pub day_start: DateTime<Utc>,
    /// Beats per minute
    pub resting_heart_rate: f64,
    /// Profile active at `day_start`
    pub therapy_profile_id: Option<Uuid>,
}

/// Minutes spent in each sleep state during a local day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailySleepDurations {
    /// Local calendar date
    pub date: NaiveDate,
    /// UTC instant of local midnight
    pub day_start: DateTime<Utc>,
    /// Awake minutes
    pub awake: f64,
    /// Core sleep minutes
    pub asleep_core: f64,
    /// Deep sleep minutes
    pub asleep_deep: f64,
    /// REM sleep minutes
    pub asleep_rem: f64,
    /// Unclassified sleep minutes
    pub asleep_unspecified: f64,
    /// Profile active at `day_start`
    pub therapy_profile_id: Option<Uuid>,
}

impl DailySleepDurations {
    /// Total minutes asleep in any state
    #[must_use]
    pub fn total_asleep(&self) -> f64 {
        self.asleep_core + self.asleep_deep + self.asleep_rem + self.asleep_unspecified
    }
}

/// Cycle day for a local day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyMenstrual {
    /// Local calendar date
    pub date: NaiveDate,
    /// UTC instant of local midnight
    pub day_start: DateTime<Utc>,
    /// Days since the latest period start on or before `date`, -1 when unknown
    pub days_since_period_start: i64,
    /// Profile active at `day_start`
    pub therapy_profile_id: Option<Uuid>,
}

impl_profile_tagged!(HourlyBgData, start);
impl_profile_tagged!(HourlyAvgBgData, start);
impl_profile_tagged!(HourlyBgPercentages, start);
impl_profile_tagged!(HourlyBgURoc, start);
impl_profile_tagged!(HourlyHeartRate, hour);
impl_profile_tagged!(DailyAverageHeartRate, day_start);
impl_profile_tagged!(HourlyExercise, hour);
impl_profile_tagged!(DailyAverageExercise, day_start);
impl_profile_tagged!(HourlyEnergy, hour);
impl_profile_tagged!(DailyAverageEnergy, day_start);
impl_profile_tagged!(HourlyBodyMass, hour);
impl_profile_tagged!(DailyRestingHeartRate, day_start);
impl_profile_tagged!(DailySleepDurations, day_start);
impl_profile_tagged!(DailyMenstrual, day_start);
