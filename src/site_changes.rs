// ABOUTME: Infusion site change events and the derived per-day "days since change" stream
// ABOUTME: Recording a change writes the event, seeds today, and rebuilds recent days from history
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Site Changes
//!
//! A site change is a point event stored under `site_changes/events` with a
//! generated ID. The `site_changes/daily` stream is derived from the full
//! event history: each local day records how many days have passed since the
//! latest change on or before it, and where that change was placed.

use crate::persistence::records::daily_document_id;
use crate::persistence::{Cadence, Document, RecordKind, StreamRecord, StreamUploader, UploadSummary};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use insite_core::errors::{AppError, AppResult};
use insite_core::time::{iso_day, iso_instant, local_date, LocalDay};
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

/// Local days rebuilt after each recorded change, today included
pub const DEFAULT_SITE_BACKFILL_DAYS: u32 = 14;

/// One recorded site change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteChangeEvent {
    /// Generated document ID
    pub id: Uuid,
    /// Body location label
    pub location: String,
    /// Zone the change was recorded in
    pub local_tz: Tz,
    /// Client time of the change
    pub timestamp: DateTime<Utc>,
}

impl SiteChangeEvent {
    /// New event with a fresh ID
    #[must_use]
    pub fn new(location: impl Into<String>, local_tz: Tz, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            location: location.into(),
            local_tz,
            timestamp,
        }
    }

    fn from_document(id: &str, document: &Document) -> Option<Self> {
        let id = Uuid::parse_str(id).ok()?;
        let location = document.get("location")?.as_str()?.to_owned();
        let timestamp = DateTime::parse_from_rfc3339(document.get("timestamp")?.as_str()?)
            .ok()?
            .with_timezone(&Utc);
        let local_tz = document
            .get("localTz")
            .and_then(|value| value.as_str())
            .and_then(|name| name.parse::<Tz>().ok())
            .unwrap_or(Tz::UTC);
        Some(Self {
            id,
            location,
            local_tz,
            timestamp,
        })
    }
}

impl StreamRecord for SiteChangeEvent {
    const KIND: RecordKind = RecordKind::SiteChanges;
    const CADENCE: Cadence = Cadence::Event;

    fn document_id(&self) -> String {
        self.id.to_string()
    }

    fn payload(&self) -> Document {
        let mut document = Document::new();
        document.insert("location".to_owned(), json!(self.location));
        document.insert("localTz".to_owned(), json!(self.local_tz.name()));
        document.insert("timestamp".to_owned(), json!(iso_instant(self.timestamp)));
        document
    }
}

/// Site status for one local day
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteChangeDaily {
    /// Local calendar date
    pub date: NaiveDate,
    /// UTC instant of local midnight
    pub day_start: DateTime<Utc>,
    /// Whole local days since the latest change on or before `date`
    pub days_since_change: i64,
    /// Location of that change
    pub location: String,
}

impl StreamRecord for SiteChangeDaily {
    const KIND: RecordKind = RecordKind::SiteChanges;
    const CADENCE: Cadence = Cadence::Daily;

    fn document_id(&self) -> String {
        daily_document_id("site", self.date)
    }

    fn payload(&self) -> Document {
        let mut document = Document::new();
        document.insert("dateUtc".to_owned(), json!(iso_day(self.day_start)));
        document.insert(
            "localDate".to_owned(),
            json!(self.date.format("%Y-%m-%d").to_string()),
        );
        document.insert("daysSinceChange".to_owned(), json!(self.days_since_change));
        document.insert("location".to_owned(), json!(self.location));
        document
    }
}

/// Daily status for each of `days` from `events`
///
/// Days before the first known change are skipped. When several changes fall
/// on the same local day the latest one supplies the location.
#[must_use]
pub fn daily_statuses(events: &[SiteChangeEvent], days: &[LocalDay], tz: Tz) -> Vec<SiteChangeDaily> {
    let mut ordered: Vec<(NaiveDate, &SiteChangeEvent)> = events
        .iter()
        .map(|event| (local_date(event.timestamp, tz), event))
        .collect();
    ordered.sort_by_key(|(_, event)| event.timestamp);

    days.iter()
        .filter_map(|day| {
            let (change_date, event) = ordered
                .iter()
                .rev()
                .find(|(change_date, _)| *change_date <= day.date)?;
            Some(SiteChangeDaily {
                date: day.date,
                day_start: day.start,
                days_since_change: (day.date - *change_date).num_days(),
                location: event.location.clone(),
            })
        })
        .collect()
}

/// Result of recording one change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteChangeOutcome {
    /// The stored event
    pub event: SiteChangeEvent,
    /// Daily statuses written, oldest first
    pub days: Vec<SiteChangeDaily>,
    /// Combined upload result for the event and the daily stream
    pub uploads: UploadSummary,
}

/// Records site changes and keeps the daily stream current
#[derive(Clone)]
pub struct SiteChangeTracker {
    uploader: StreamUploader,
    backfill_days: u32,
}

impl SiteChangeTracker {
    /// Tracker rebuilding [`DEFAULT_SITE_BACKFILL_DAYS`] days per change
    #[must_use]
    pub fn new(uploader: StreamUploader) -> Self {
        Self {
            uploader,
            backfill_days: DEFAULT_SITE_BACKFILL_DAYS,
        }
    }

    /// Override how many local days are rebuilt, at least one
    #[must_use]
    pub fn with_backfill_days(mut self, backfill_days: u32) -> Self {
        self.backfill_days = backfill_days.max(1);
        self
    }

    /// Every stored change, oldest first; unreadable documents are skipped
    ///
    /// # Errors
    ///
    /// Returns a storage error when the events collection cannot be listed
    pub async fn history(&self) -> AppResult<Vec<SiteChangeEvent>> {
        let collection = self.uploader.collection_for::<SiteChangeEvent>();
        let documents = self.uploader.store().list(&collection).await?;
        let mut events: Vec<SiteChangeEvent> = documents
            .iter()
            .filter_map(|(id, document)| {
                let event = SiteChangeEvent::from_document(id, document);
                if event.is_none() {
                    warn!(document_id = %id, "skipping malformed site change event");
                }
                event
            })
            .collect();
        events.sort_by_key(|event| event.timestamp);
        Ok(events)
    }

    /// Record a change at `at` and rebuild the trailing daily statuses
    ///
    /// # Errors
    ///
    /// Returns an error if `location` is blank, if the event write fails, or
    /// if the history cannot be read back
    pub async fn record_site_change(
        &self,
        location: &str,
        tz: Tz,
        at: DateTime<Utc>,
    ) -> AppResult<SiteChangeOutcome> {
        let location = location.trim();
        if location.is_empty() {
            return Err(AppError::invalid_input("site location must not be empty"));
        }

        let event = SiteChangeEvent::new(location, tz, at);
        let mut uploads = self.uploader.upsert(std::slice::from_ref(&event)).await;
        if !uploads.is_complete() {
            return Err(AppError::storage(format!(
                "site change event {} was not written",
                event.id
            )));
        }

        let today = LocalDay::new(local_date(at, tz), tz);
        let seed = SiteChangeDaily {
            date: today.date,
            day_start: today.start,
            days_since_change: 0,
            location: event.location.clone(),
        };
        uploads.absorb(self.uploader.upsert(std::slice::from_ref(&seed)).await);

        let history = self.history().await?;
        let first = today.date - Duration::days(i64::from(self.backfill_days) - 1);
        let days: Vec<LocalDay> = first
            .iter_days()
            .take_while(|date| *date <= today.date)
            .map(|date| LocalDay::new(date, tz))
            .collect();
        let statuses = daily_statuses(&history, &days, tz);
        uploads.absorb(self.uploader.upsert(&statuses).await);

        info!(
            site.location = %event.location,
            site.event = %event.id,
            site.days = statuses.len(),
            "site change recorded"
        );
        Ok(SiteChangeOutcome {
            event,
            days: statuses,
            uploads,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(text: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(text).unwrap().with_timezone(&Utc)
    }

    fn day(text: &str) -> LocalDay {
        LocalDay::new(NaiveDate::parse_from_str(text, "%Y-%m-%d").unwrap(), Tz::UTC)
    }

    #[test]
    fn test_days_count_from_latest_change_on_or_before() {
        let events = vec![
            SiteChangeEvent::new("abdomen", Tz::UTC, at("2025-03-01T08:00:00Z")),
            SiteChangeEvent::new("arm", Tz::UTC, at("2025-03-04T21:00:00Z")),
        ];
        let days = [
            day("2025-02-28"),
            day("2025-03-01"),
            day("2025-03-03"),
            day("2025-03-04"),
            day("2025-03-06"),
        ];
        let statuses = daily_statuses(&events, &days, Tz::UTC);

        let summary: Vec<(i64, &str)> = statuses
            .iter()
            .map(|status| (status.days_since_change, status.location.as_str()))
            .collect();
        assert_eq!(
            summary,
            vec![(0, "abdomen"), (2, "abdomen"), (0, "arm"), (2, "arm")]
        );
    }

    #[test]
    fn test_event_payload_round_trips_through_document() {
        let event = SiteChangeEvent::new("thigh", Tz::Europe__Berlin, at("2025-03-01T08:15:00Z"));
        let parsed =
            SiteChangeEvent::from_document(&event.document_id(), &event.payload()).unwrap();
        assert_eq!(parsed, event);
    }
}
