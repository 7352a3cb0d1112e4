// ABOUTME: Core data models for therapy configuration, metric records, and sync state
// ABOUTME: Re-exports HourRange, TherapySnapshot, metric record shapes, and SyncCheckpoint
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Data Models
//!
//! - `HourRange` / `TherapyProfile` / `TherapySnapshot`: versioned therapy configuration
//! - `TherapyHour`: settings resolved for one UTC hour
//! - Metric records: hourly and daily buckets per metric family
//! - `SyncCheckpoint`: persisted sync progress

/// Persisted sync progress
pub mod checkpoint;
/// Time-bucketed metric records
pub mod metrics;
/// Therapy configuration and the hour-range resolver
pub mod therapy;

pub use checkpoint::SyncCheckpoint;
pub use metrics::{
    DailyAverageEnergy, DailyAverageExercise, DailyAverageHeartRate, DailyMenstrual,
    DailyRestingHeartRate, DailySleepDurations, HourlyAvgBgData, HourlyBgData,
    HourlyBgPercentages, HourlyBgURoc, HourlyBodyMass, HourlyEnergy, HourlyExercise,
    HourlyHeartRate, ProfileTagged,
};
pub use therapy::{resolve_hour_range, HourRange, TherapyHour, TherapyProfile, TherapySnapshot};
