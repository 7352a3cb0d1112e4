// ABOUTME: Maps each metric record to its document kind, subpath, stable ID, and payload
// ABOUTME: Document IDs derive from the bucket's hour or local date so re-uploads overwrite instead of duplicating
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Stream Records
//!
//! Every stream the pipeline uploads implements [`StreamRecord`]. The record
//! decides where it lives (`{kind}/{subpath}/items`) and under which ID:
//!
//! | record | kind/subpath | ID |
//! |---|---|---|
//! | `HourlyBgData` | `blood_glucose/hourly` | `bg-{hour}` |
//! | `HourlyAvgBgData` | `blood_glucose/average` | `bg-avg-{hour}` |
//! | `HourlyBgPercentages` | `blood_glucose/percent` | `bg-pct-{hour}` |
//! | `HourlyBgURoc` | `blood_glucose/uROC` | `bg-uroc-{hour}` |
//! | `HourlyHeartRate` | `heart_rate/hourly` | `hr-{hour}` |
//! | `DailyAverageHeartRate` | `heart_rate/daily_average` | `hr-avg-{day}` |
//! | `HourlyExercise` | `exercise/hourly` | `ex-{hour}` |
//! | `DailyAverageExercise` | `exercise/daily_average` | `ex-avg-{day}` |
//! | `HourlyEnergy` | `energy/hourly` | `en-{hour}` |
//! | `DailyAverageEnergy` | `energy/daily_average` | `en-avg-{day}` |
//! | `HourlyBodyMass` | `body_mass/hourly` | `mass-{hour}` |
//! | `DailyRestingHeartRate` | `resting_heart_rate/daily` | `rhr-{day}` |
//! | `DailySleepDurations` | `sleep/daily` | `sleep-{day}` |
//! | `DailyMenstrual` | `menstrual/daily` | `menses-{day}` |
//! | `TherapyHour` | `therapy_settings/hourly` | `therapy-{hour}` |
//!
//! `{hour}` is `YYYY-MM-DDTHH:00:00Z` of the floored bucket start and `{day}`
//! is the local calendar date of the day bucket. Two local days can begin on
//! the same UTC date around a DST shift, so the UTC date is only a payload field.

use super::Document;
use chrono::{DateTime, NaiveDate, Utc};
use insite_core::models::{
    DailyAverageEnergy, DailyAverageExercise, DailyAverageHeartRate, DailyMenstrual,
    DailyRestingHeartRate, DailySleepDurations, HourlyAvgBgData, HourlyBgData,
    HourlyBgPercentages, HourlyBgURoc, HourlyBodyMass, HourlyEnergy, HourlyExercise,
    HourlyHeartRate, TherapyHour,
};
use insite_core::time::{iso_day, iso_hour, iso_instant};
use serde_json::{json, Value};
use std::fmt;
use uuid::Uuid;

/// Top-level collection a record belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RecordKind {
    /// Glucose streams
    BloodGlucose,
    /// Heart rate streams
    HeartRate,
    /// Basal and active energy
    Energy,
    /// Move and exercise minutes
    Exercise,
    /// Sleep stage durations
    Sleep,
    /// Body mass
    BodyMass,
    /// Resting heart rate
    RestingHeartRate,
    /// Hourly therapy settings projection
    TherapySettings,
    /// Cycle tracking
    Menstrual,
    /// Infusion site changes
    SiteChanges,
}

impl RecordKind {
    /// Collection name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BloodGlucose => "blood_glucose",
            Self::HeartRate => "heart_rate",
            Self::Energy => "energy",
            Self::Exercise => "exercise",
            Self::Sleep => "sleep",
            Self::BodyMass => "body_mass",
            Self::RestingHeartRate => "resting_heart_rate",
            Self::TherapySettings => "therapy_settings",
            Self::Menstrual => "menstrual",
            Self::SiteChanges => "site_changes",
        }
    }

    /// Subpath used when a record does not name its own
    #[must_use]
    pub const fn default_subpath(self, cadence: Cadence) -> &'static str {
        match (self, cadence) {
            (Self::HeartRate | Self::Energy | Self::Exercise, Cadence::Daily) => "daily_average",
            (Self::SiteChanges, Cadence::Event) => "events",
            (_, Cadence::Hourly) => "hourly",
            (_, Cadence::Daily) => "daily",
            (_, Cadence::Event) => "event",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bucket width of a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cadence {
    /// One UTC hour
    Hourly,
    /// One local day
    Daily,
    /// A point event with a generated ID
    Event,
}

/// A record the uploader can place in the document store
pub trait StreamRecord {
    /// Top-level collection
    const KIND: RecordKind;
    /// Bucket width
    const CADENCE: Cadence;
    /// Subpath under the kind, when it differs from the cadence default
    const SUBPATH: Option<&'static str> = None;

    /// Subpath under the kind
    #[must_use]
    fn subpath() -> &'static str {
        match Self::SUBPATH {
            Some(subpath) => subpath,
            None => Self::KIND.default_subpath(Self::CADENCE),
        }
    }

    /// Stable document identifier
    fn document_id(&self) -> String;

    /// Fields merged into the document
    fn payload(&self) -> Document;
}

/// `{prefix}-{YYYY-MM-DDTHH:00:00Z}`
#[must_use]
pub fn hourly_document_id(prefix: &str, bucket_start: DateTime<Utc>) -> String {
    format!("{prefix}-{}", iso_hour(bucket_start))
}

/// `{prefix}-{YYYY-MM-DD}` of the local calendar date
#[must_use]
pub fn daily_document_id(prefix: &str, date: NaiveDate) -> String {
    format!("{prefix}-{}", date.format("%Y-%m-%d"))
}

fn object(value: Value) -> Document {
    match value {
        Value::Object(map) => map,
        _ => Document::new(),
    }
}

fn put_opt(document: &mut Document, key: &str, value: Option<f64>) {
    if let Some(value) = value {
        document.insert(key.to_owned(), json!(value));
    }
}

fn put_profile(document: &mut Document, profile_id: Option<Uuid>) {
    if let Some(profile_id) = profile_id {
        document.insert("therapyProfileId".to_owned(), json!(profile_id.to_string()));
    }
}

fn hour_span(start: DateTime<Utc>, end: DateTime<Utc>) -> Document {
    object(json!({
        "startUtc": iso_hour(start),
        "endUtc": iso_instant(end),
    }))
}

fn day_fields(date: NaiveDate, day_start: DateTime<Utc>) -> Document {
    object(json!({
        "dateUtc": iso_day(day_start),
        "localDate": date.format("%Y-%m-%d").to_string(),
    }))
}

impl StreamRecord for HourlyBgData {
    const KIND: RecordKind = RecordKind::BloodGlucose;
    const CADENCE: Cadence = Cadence::Hourly;

    fn document_id(&self) -> String {
        hourly_document_id("bg", self.start)
    }

    fn payload(&self) -> Document {
        let mut document = hour_span(self.start, self.end);
        put_opt(&mut document, "startBg", self.start_bg);
        put_opt(&mut document, "endBg", self.end_bg);
        put_profile(&mut document, self.therapy_profile_id);
        document
    }
}

impl StreamRecord for HourlyAvgBgData {
    const KIND: RecordKind = RecordKind::BloodGlucose;
    const CADENCE: Cadence = Cadence::Hourly;
    const SUBPATH: Option<&'static str> = Some("average");

    fn document_id(&self) -> String {
        hourly_document_id("bg-avg", self.start)
    }

    fn payload(&self) -> Document {
        let mut document = hour_span(self.start, self.end);
        put_opt(&mut document, "averageBg", self.average_bg);
        put_profile(&mut document, self.therapy_profile_id);
        document
    }
}

impl StreamRecord for HourlyBgPercentages {
    const KIND: RecordKind = RecordKind::BloodGlucose;
    const CADENCE: Cadence = Cadence::Hourly;
    const SUBPATH: Option<&'static str> = Some("percent");

    fn document_id(&self) -> String {
        hourly_document_id("bg-pct", self.start)
    }

    fn payload(&self) -> Document {
        let mut document = hour_span(self.start, self.end);
        document.insert("percentLow".to_owned(), json!(self.percent_low));
        document.insert("percentHigh".to_owned(), json!(self.percent_high));
        put_profile(&mut document, self.therapy_profile_id);
        document
    }
}

impl StreamRecord for HourlyBgURoc {
    const KIND: RecordKind = RecordKind::BloodGlucose;
    const CADENCE: Cadence = Cadence::Hourly;
    const SUBPATH: Option<&'static str> = Some("uROC");

    fn document_id(&self) -> String {
        hourly_document_id("bg-uroc", self.start)
    }

    fn payload(&self) -> Document {
        let mut document = hour_span(self.start, self.end);
        put_opt(&mut document, "uRoc", self.uroc);
        put_opt(&mut document, "expectedEndBg", self.expected_end_bg);
        put_profile(&mut document, self.therapy_profile_id);
        document
    }
}

impl StreamRecord for HourlyHeartRate {
    const KIND: RecordKind = RecordKind::HeartRate;
    const CADENCE: Cadence = Cadence::Hourly;

    fn document_id(&self) -> String {
        hourly_document_id("hr", self.hour)
    }

    fn payload(&self) -> Document {
        let mut document = object(json!({
            "hourUtc": iso_hour(self.hour),
            "heartRate": self.heart_rate,
        }));
        put_profile(&mut document, self.therapy_profile_id);
        document
    }
}

impl StreamRecord for DailyAverageHeartRate {
    const KIND: RecordKind = RecordKind::HeartRate;
    const CADENCE: Cadence = Cadence::Daily;

    fn document_id(&self) -> String {
        daily_document_id("hr-avg", self.date)
    }

    fn payload(&self) -> Document {
        let mut document = day_fields(self.date, self.day_start);
        document.insert("averageHeartRate".to_owned(), json!(self.average_heart_rate));
        put_profile(&mut document, self.therapy_profile_id);
        document
    }
}

impl StreamRecord for HourlyExercise {
    const KIND: RecordKind = RecordKind::Exercise;
    const CADENCE: Cadence = Cadence::Hourly;

    fn document_id(&self) -> String {
        hourly_document_id("ex", self.hour)
    }

    fn payload(&self) -> Document {
        let mut document = object(json!({
            "hourUtc": iso_hour(self.hour),
            "moveMinutes": self.move_minutes,
            "exerciseMinutes": self.exercise_minutes,
            "totalMinutes": self.total_minutes,
        }));
        put_profile(&mut document, self.therapy_profile_id);
        document
    }
}

impl StreamRecord for DailyAverageExercise {
    const KIND: RecordKind = RecordKind::Exercise;
    const CADENCE: Cadence = Cadence::Daily;

    fn document_id(&self) -> String {
        daily_document_id("ex-avg", self.date)
    }

    fn payload(&self) -> Document {
        let mut document = day_fields(self.date, self.day_start);
        document.insert("averageMoveMinutes".to_owned(), json!(self.average_move_minutes));
        document.insert(
            "averageExerciseMinutes".to_owned(),
            json!(self.average_exercise_minutes),
        );
        document.insert("averageTotalMinutes".to_owned(), json!(self.average_total_minutes));
        put_profile(&mut document, self.therapy_profile_id);
        document
    }
}

impl StreamRecord for HourlyEnergy {
    const KIND: RecordKind = RecordKind::Energy;
    const CADENCE: Cadence = Cadence::Hourly;

    fn document_id(&self) -> String {
        hourly_document_id("en", self.hour)
    }

    fn payload(&self) -> Document {
        let mut document = object(json!({
            "hourUtc": iso_hour(self.hour),
            "basalEnergy": self.basal_energy,
            "activeEnergy": self.active_energy,
            "totalEnergy": self.total_energy,
        }));
        put_profile(&mut document, self.therapy_profile_id);
        document
    }
}

impl StreamRecord for DailyAverageEnergy {
    const KIND: RecordKind = RecordKind::Energy;
    const CADENCE: Cadence = Cadence::Daily;

    fn document_id(&self) -> String {
        daily_document_id("en-avg", self.date)
    }

    fn payload(&self) -> Document {
        let mut document = day_fields(self.date, self.day_start);
        document.insert("averageActiveEnergy".to_owned(), json!(self.average_active_energy));
        put_profile(&mut document, self.therapy_profile_id);
        document
    }
}

impl StreamRecord for HourlyBodyMass {
    const KIND: RecordKind = RecordKind::BodyMass;
    const CADENCE: Cadence = Cadence::Hourly;

    fn document_id(&self) -> String {
        hourly_document_id("mass", self.hour)
    }

    fn payload(&self) -> Document {
        let mut document = object(json!({
            "hourUtc": iso_hour(self.hour),
            "weight": self.weight,
        }));
        put_profile(&mut document, self.therapy_profile_id);
        document
    }
}

impl StreamRecord for DailyRestingHeartRate {
    const KIND: RecordKind = RecordKind::RestingHeartRate;
    const CADENCE: Cadence = Cadence::Daily;

    fn document_id(&self) -> String {
        daily_document_id("rhr", self.date)
    }

    fn payload(&self) -> Document {
        let mut document = day_fields(self.date, self.day_start);
        document.insert("restingHeartRate".to_owned(), json!(self.resting_heart_rate));
        put_profile(&mut document, self.therapy_profile_id);
        document
    }
}

impl StreamRecord for DailySleepDurations {
    const KIND: RecordKind = RecordKind::Sleep;
    const CADENCE: Cadence = Cadence::Daily;

    fn document_id(&self) -> String {
        daily_document_id("sleep", self.date)
    }

    fn payload(&self) -> Document {
        let mut document = day_fields(self.date, self.day_start);
        document.insert("awake".to_owned(), json!(self.awake));
        document.insert("asleepCore".to_owned(), json!(self.asleep_core));
        document.insert("asleepDeep".to_owned(), json!(self.asleep_deep));
        document.insert("asleepREM".to_owned(), json!(self.asleep_rem));
        document.insert("asleepUnspecified".to_owned(), json!(self.asleep_unspecified));
        put_profile(&mut document, self.therapy_profile_id);
        document
    }
}

impl StreamRecord for DailyMenstrual {
    const KIND: RecordKind = RecordKind::Menstrual;
    const CADENCE: Cadence = Cadence::Daily;

    fn document_id(&self) -> String {
        daily_document_id("menses", self.date)
    }

    fn payload(&self) -> Document {
        let mut document = day_fields(self.date, self.day_start);
        document.insert(
            "daysSincePeriodStart".to_owned(),
            json!(self.days_since_period_start),
        );
        put_profile(&mut document, self.therapy_profile_id);
        document
    }
}

impl StreamRecord for TherapyHour {
    const KIND: RecordKind = RecordKind::TherapySettings;
    const CADENCE: Cadence = Cadence::Hourly;

    fn document_id(&self) -> String {
        hourly_document_id("therapy", self.hour_start_utc)
    }

    fn payload(&self) -> Document {
        object(json!({
            "hourStartUtc": iso_hour(self.hour_start_utc),
            "profileId": self.profile_id.to_string(),
            "profileName": self.profile_name,
            "snapshotTimestamp": iso_instant(self.snapshot_timestamp),
            "carbRatio": self.carb_ratio,
            "basalRate": self.basal_rate,
            "insulinSensitivity": self.insulin_sensitivity,
            "localTz": self.local_tz,
            "localHour": self.local_hour,
        }))
    }
}
