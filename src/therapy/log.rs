// ABOUTME: Append-only therapy snapshot log: shared in-process cache and remote document log
// ABOUTME: Answers "which configuration was active at T" with an as-of lookup over ordered snapshots
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Therapy Snapshot Log
//!
//! Snapshots are never edited. A later snapshot shadows an earlier one from its
//! timestamp forward, so the configuration active at `T` is the last snapshot
//! with `timestamp <= T`.
//!
//! [`SnapshotLog`] is the shared cache read by every sync branch. Readers take
//! a [`SnapshotTimeline`], an immutable sorted copy, and perform lookups without
//! holding the lock.

use crate::persistence::{account_collection, Document, DocumentPath, DocumentStore, WriteBatch};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use insite_core::constants::storage::THERAPY_LOG_COLLECTION;
use insite_core::errors::{AppError, AppResult};
use insite_core::models::{resolve_hour_range, TherapyHour, TherapySnapshot};
use insite_core::time::{floor_hour, local_hour};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

/// Immutable, ascending view of the snapshot log
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SnapshotTimeline {
    snapshots: Vec<TherapySnapshot>,
}

impl SnapshotTimeline {
    /// Timeline over `snapshots`, sorted stably by timestamp
    #[must_use]
    pub fn new(mut snapshots: Vec<TherapySnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.timestamp);
        Self { snapshots }
    }

    /// Snapshots oldest first
    #[must_use]
    pub fn snapshots(&self) -> &[TherapySnapshot] {
        &self.snapshots
    }

    /// Number of snapshots
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Whether the log is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Last snapshot with `timestamp <= at`
    #[must_use]
    pub fn active_at(&self, at: DateTime<Utc>) -> Option<&TherapySnapshot> {
        let after = self
            .snapshots
            .partition_point(|snapshot| snapshot.timestamp <= at);
        after.checked_sub(1).map(|index| &self.snapshots[index])
    }

    /// Profile active at `at`
    #[must_use]
    pub fn profile_at(&self, at: DateTime<Utc>) -> Option<Uuid> {
        self.active_at(at).map(|snapshot| snapshot.profile_id)
    }

    /// Settings for the UTC hour containing `at`.
    ///
    /// `None` when no snapshot is active yet or none of its ranges contain the
    /// local hour.
    #[must_use]
    pub fn resolve(&self, at: DateTime<Utc>, tz: Tz) -> Option<TherapyHour> {
        let hour_start = floor_hour(at);
        let snapshot = self.active_at(hour_start)?;
        let hour = local_hour(hour_start, tz);
        let range = resolve_hour_range(hour, &snapshot.hour_ranges)?;
        Some(TherapyHour {
            hour_start_utc: hour_start,
            profile_id: snapshot.profile_id,
            profile_name: snapshot.profile_name.clone(),
            snapshot_timestamp: snapshot.timestamp,
            carb_ratio: range.carb_ratio,
            basal_rate: range.basal_rate,
            insulin_sensitivity: range.insulin_sensitivity,
            local_tz: tz.name().to_owned(),
            local_hour: hour,
        })
    }
}

/// Shared snapshot cache: concurrent readers, ordered exclusive appends
#[derive(Debug, Clone, Default)]
pub struct SnapshotLog {
    snapshots: Arc<RwLock<Vec<TherapySnapshot>>>,
}

impl SnapshotLog {
    /// Empty log
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one snapshot, keeping ascending order.
    ///
    /// An equal timestamp lands after the existing entries, so the newest
    /// append shadows them.
    pub async fn append(&self, snapshot: TherapySnapshot) {
        let mut snapshots = self.snapshots.write().await;
        if snapshots.iter().any(|existing| existing.id == snapshot.id) {
            return;
        }
        let index = snapshots.partition_point(|existing| existing.timestamp <= snapshot.timestamp);
        snapshots.insert(index, snapshot);
    }

    /// Merge loaded snapshots, skipping ids already present. Returns how many were added.
    pub async fn merge(&self, loaded: Vec<TherapySnapshot>) -> usize {
        let mut snapshots = self.snapshots.write().await;
        let mut known: HashSet<Uuid> = snapshots.iter().map(|snapshot| snapshot.id).collect();
        let mut added = 0;
        for snapshot in loaded {
            if known.insert(snapshot.id) {
                let index =
                    snapshots.partition_point(|existing| existing.timestamp <= snapshot.timestamp);
                snapshots.insert(index, snapshot);
                added += 1;
            }
        }
        added
    }

    /// Copy of the current log for lock-free lookups
    pub async fn timeline(&self) -> SnapshotTimeline {
        SnapshotTimeline {
            snapshots: self.snapshots.read().await.clone(),
        }
    }

    /// Last snapshot with `timestamp <= at`
    pub async fn active_at(&self, at: DateTime<Utc>) -> Option<TherapySnapshot> {
        let snapshots = self.snapshots.read().await;
        let after = snapshots.partition_point(|snapshot| snapshot.timestamp <= at);
        after.checked_sub(1).map(|index| snapshots[index].clone())
    }

    /// Number of cached snapshots
    pub async fn len(&self) -> usize {
        self.snapshots.read().await.len()
    }

    /// Whether the cache is empty
    pub async fn is_empty(&self) -> bool {
        self.snapshots.read().await.is_empty()
    }
}

/// Remote copy of the snapshot log at `accounts/{account}/therapy_settings_log/{id}`
#[derive(Clone)]
pub struct TherapyLogStore {
    store: Arc<dyn DocumentStore>,
    account_id: String,
}

impl TherapyLogStore {
    /// Log store for `account_id`
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>, account_id: impl Into<String>) -> Self {
        Self {
            store,
            account_id: account_id.into(),
        }
    }

    /// Collection holding the log
    #[must_use]
    pub fn collection(&self) -> String {
        account_collection(&self.account_id, THERAPY_LOG_COLLECTION)
    }

    /// Persist one snapshot under its id
    ///
    /// # Errors
    ///
    /// Returns a serialization or storage error if the write fails
    pub async fn append(&self, snapshot: &TherapySnapshot) -> AppResult<()> {
        let fields = match serde_json::to_value(snapshot)? {
            Value::Object(map) => map,
            _ => return Err(AppError::serialization("snapshot did not serialize to an object")),
        };
        let mut batch = WriteBatch::with_capacity(1);
        batch.merge(
            DocumentPath::new(self.collection(), snapshot.id.to_string()),
            fields,
        );
        self.store.commit(batch).await?;
        debug!(snapshot_id = %snapshot.id, therapy.profile_id = %snapshot.profile_id, "therapy snapshot persisted");
        Ok(())
    }

    /// Every snapshot with `timestamp <= end`, oldest first.
    ///
    /// Documents that do not parse as snapshots are logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the collection cannot be listed
    pub async fn load_until(&self, end: DateTime<Utc>) -> AppResult<Vec<TherapySnapshot>> {
        let documents = self.store.list(&self.collection()).await?;
        let mut snapshots: Vec<TherapySnapshot> = documents
            .into_iter()
            .filter_map(|(id, document)| parse_snapshot(&id, document))
            .filter(|snapshot| snapshot.timestamp <= end)
            .collect();
        snapshots.sort_by_key(|snapshot| snapshot.timestamp);
        Ok(snapshots)
    }
}

fn parse_snapshot(id: &str, document: Document) -> Option<TherapySnapshot> {
    match serde_json::from_value(Value::Object(document)) {
        Ok(snapshot) => Some(snapshot),
        Err(e) => {
            warn!(document_id = id, error = %e, "skipping malformed therapy snapshot");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::InMemoryDocumentStore;
    use chrono::Duration;
    use insite_core::models::{HourRange, TherapyProfile};

    fn at(text: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(text).unwrap().with_timezone(&Utc)
    }

    fn snapshot(name: &str, timestamp: DateTime<Utc>) -> TherapySnapshot {
        let profile = TherapyProfile::new(name, vec![HourRange::new(0, 23, 10.0, 0.5, 40.0)]);
        TherapySnapshot::capture(&profile, timestamp)
    }

    #[test]
    fn test_as_of_lookup() {
        let t0 = at("2025-01-01T00:00:00Z");
        let a = snapshot("A", t0);
        let b = snapshot("B", t0 + Duration::hours(10));
        let timeline = SnapshotTimeline::new(vec![b.clone(), a.clone()]);

        assert_eq!(timeline.profile_at(t0 + Duration::hours(5)), Some(a.profile_id));
        assert_eq!(timeline.profile_at(t0 + Duration::hours(10)), Some(b.profile_id));
        assert_eq!(timeline.profile_at(t0 - Duration::hours(1)), None);
    }

    #[tokio::test]
    async fn test_equal_timestamp_append_shadows() {
        let t0 = at("2025-01-01T00:00:00Z");
        let log = SnapshotLog::new();
        let first = snapshot("First", t0);
        let second = snapshot("Second", t0);
        log.append(first).await;
        log.append(second.clone()).await;
        assert_eq!(log.active_at(t0).await.unwrap().id, second.id);
    }

    #[tokio::test]
    async fn test_merge_dedupes_by_id() {
        let t0 = at("2025-01-01T00:00:00Z");
        let log = SnapshotLog::new();
        let a = snapshot("A", t0);
        log.append(a.clone()).await;
        let added = log.merge(vec![a, snapshot("B", t0 - Duration::hours(2))]).await;
        assert_eq!(added, 1);
        let timeline = log.timeline().await;
        assert_eq!(timeline.len(), 2);
        assert_eq!(timeline.snapshots()[0].profile_name, "B");
    }

    #[test]
    fn test_resolve_reports_local_hour() {
        let profile = TherapyProfile::new(
            "Night",
            vec![
                HourRange::new(22, 5, 12.0, 0.6, 45.0),
                HourRange::new(6, 21, 10.0, 0.8, 40.0),
            ],
        );
        let timeline =
            SnapshotTimeline::new(vec![TherapySnapshot::capture(&profile, at("2025-01-01T00:00:00Z"))]);
        let hour = timeline
            .resolve(at("2025-01-02T04:30:00Z"), chrono_tz::America::New_York)
            .unwrap();
        assert_eq!(hour.local_hour, 23);
        assert_eq!(hour.hour_start_utc, at("2025-01-02T04:00:00Z"));
        assert!((hour.carb_ratio - 12.0).abs() < f64::EPSILON);
        assert_eq!(hour.local_tz, "America/New_York");
    }

    #[tokio::test]
    async fn test_remote_log_filters_by_end() {
        let memory = InMemoryDocumentStore::new();
        let log = TherapyLogStore::new(Arc::new(memory), "acct");
        let t0 = at("2025-01-01T00:00:00Z");
        log.append(&snapshot("Later", t0 + Duration::days(2))).await.unwrap();
        log.append(&snapshot("Early", t0)).await.unwrap();

        let loaded = log.load_until(t0 + Duration::days(1)).await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].profile_name, "Early");
        assert_eq!(log.collection(), "accounts/acct/therapy_settings_log");
    }
}
