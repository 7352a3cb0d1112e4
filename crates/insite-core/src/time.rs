// ABOUTME: UTC hour flooring, local-day boundaries, and stable document ID formatting
// ABOUTME: Every bucket and document identity in the pipeline is derived from these helpers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Time bucket helpers.
//!
//! Hourly buckets are always UTC-aligned. Daily buckets follow local midnights
//! in the configured IANA zone, so a day can be 23 or 25 hours long around DST
//! transitions.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Timelike, Utc};
use chrono_tz::Tz;

/// Floor an instant to the start of its UTC hour
#[must_use]
pub fn floor_hour(instant: DateTime<Utc>) -> DateTime<Utc> {
    let seconds = instant.timestamp();
    let floored = seconds - seconds.rem_euclid(crate::constants::time::SECONDS_PER_HOUR);
    DateTime::from_timestamp(floored, 0).unwrap_or(instant)
}

/// ISO-8601 UTC hour string used in hourly document IDs: `YYYY-MM-DDTHH:00:00Z`
#[must_use]
pub fn iso_hour(instant: DateTime<Utc>) -> String {
    floor_hour(instant).format("%Y-%m-%dT%H:00:00Z").to_string()
}

/// ISO-8601 UTC instant without fractional seconds
#[must_use]
pub fn iso_instant(instant: DateTime<Utc>) -> String {
    instant.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// ISO-8601 UTC calendar day used in daily document IDs: `YYYY-MM-DD`
#[must_use]
pub fn iso_day(instant: DateTime<Utc>) -> String {
    instant.format("%Y-%m-%d").to_string()
}

/// Hour of day (0-23) of an instant in the given zone
#[must_use]
pub fn local_hour(instant: DateTime<Utc>, tz: Tz) -> u8 {
    // hour() is always < 24
    u8::try_from(instant.with_timezone(&tz).hour()).unwrap_or(0)
}

/// Local calendar date of an instant in the given zone
#[must_use]
pub fn local_date(instant: DateTime<Utc>, tz: Tz) -> NaiveDate {
    instant.with_timezone(&tz).date_naive()
}

/// UTC instant of local midnight for `date` in `tz`.
///
/// When midnight does not exist (a DST gap at 00:00) the first valid local
/// instant after it is used.
#[must_use]
pub fn local_midnight(date: NaiveDate, tz: Tz) -> DateTime<Utc> {
    let midnight = date.and_time(NaiveTime::MIN);
    for shift in 0..=2 {
        if let Some(local) = tz
            .from_local_datetime(&(midnight + Duration::hours(shift)))
            .earliest()
        {
            return local.with_timezone(&Utc);
        }
    }
    Utc.from_utc_datetime(&midnight)
}

/// One local calendar day expressed as a UTC half-open range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalDay {
    /// Local calendar date
    pub date: NaiveDate,
    /// UTC instant of local midnight starting the day
    pub start: DateTime<Utc>,
    /// UTC instant of the following local midnight
    pub end: DateTime<Utc>,
}

impl LocalDay {
    /// Build the local day for `date` in `tz`
    #[must_use]
    pub fn new(date: NaiveDate, tz: Tz) -> Self {
        let next = date.succ_opt().unwrap_or(date);
        Self {
            date,
            start: local_midnight(date, tz),
            end: local_midnight(next, tz),
        }
    }

    /// Whether `instant` falls in `[start, end)`
    #[must_use]
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }
}

/// Local days touched by `[start, end]`, oldest first
#[must_use]
pub fn local_days(start: DateTime<Utc>, end: DateTime<Utc>, tz: Tz) -> Vec<LocalDay> {
    if end < start {
        return Vec::new();
    }
    let last = local_date(end, tz);
    let mut date = local_date(start, tz);
    let mut days = Vec::new();
    while date <= last {
        days.push(LocalDay::new(date, tz));
        match date.succ_opt() {
            Some(next) => date = next,
            None => break,
        }
    }
    days
}

/// UTC hour bucket starts in `[floor_hour(start), floor_hour(end)]`, inclusive of both ends
#[must_use]
pub fn hour_buckets_inclusive(start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<DateTime<Utc>> {
    let last = floor_hour(end);
    let mut cursor = floor_hour(start);
    let mut buckets = Vec::new();
    while cursor <= last {
        buckets.push(cursor);
        cursor += Duration::hours(1);
    }
    buckets
}

/// UTC hour bucket starts in `[floor_hour(start), end)`
#[must_use]
pub fn hour_buckets(start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<DateTime<Utc>> {
    let mut cursor = floor_hour(start);
    let mut buckets = Vec::new();
    while cursor < end {
        buckets.push(cursor);
        cursor += Duration::hours(1);
    }
    buckets
}
