// ABOUTME: Hourly therapy backfill joining UTC hour buckets against the snapshot log
// ABOUTME: Loads snapshots up to the window end, refreshes the shared cache, and emits TherapyHour rows
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::log::{SnapshotLog, SnapshotTimeline, TherapyLogStore};
use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use insite_core::constants::therapy::DEFAULT_BACKFILL_BUFFER_HOURS;
use insite_core::errors::AppResult;
use insite_core::models::{SyncCheckpoint, TherapyHour};
use insite_core::time::hour_buckets_inclusive;
use tracing::{debug, info};

/// Resolve every UTC hour in `[floor_hour(start), floor_hour(end)]`.
///
/// Hours before the first snapshot, or whose local hour no range covers, are
/// skipped rather than filled.
#[must_use]
pub fn backfill_hours(
    timeline: &SnapshotTimeline,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    tz: Tz,
) -> Vec<TherapyHour> {
    if timeline.is_empty() {
        return Vec::new();
    }
    hour_buckets_inclusive(start, end)
        .into_iter()
        .filter_map(|hour| timeline.resolve(hour, tz))
        .collect()
}

/// Result of one backfill run
#[derive(Debug, Clone, PartialEq)]
pub struct BackfillOutcome {
    /// Window walked, after the look-back buffer
    pub window_start: DateTime<Utc>,
    /// Window end
    pub window_end: DateTime<Utc>,
    /// Snapshots in the log after loading
    pub snapshots: usize,
    /// Resolved hours
    pub hours: Vec<TherapyHour>,
}

/// Projects the therapy snapshot log onto hourly rows
#[derive(Clone)]
pub struct BackfillEngine {
    log_store: TherapyLogStore,
    cache: SnapshotLog,
    buffer: Duration,
}

impl BackfillEngine {
    /// Engine with the default 24 hour look-back buffer
    #[must_use]
    pub fn new(log_store: TherapyLogStore, cache: SnapshotLog) -> Self {
        Self {
            log_store,
            cache,
            buffer: Duration::hours(DEFAULT_BACKFILL_BUFFER_HOURS),
        }
    }

    /// Override the look-back buffer
    #[must_use]
    pub fn with_buffer_hours(mut self, hours: i64) -> Self {
        self.buffer = Duration::hours(hours.max(0));
        self
    }

    /// Shared cache this engine refreshes
    #[must_use]
    pub const fn cache(&self) -> &SnapshotLog {
        &self.cache
    }

    /// Window for the next pass: `[last backfill (or one month ago) - buffer, now]`
    #[must_use]
    pub fn window(&self, checkpoint: &SyncCheckpoint, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        (checkpoint.backfill_window_start(now) - self.buffer, now)
    }

    /// Load snapshots up to `end` into the shared cache. Returns how many were new.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the remote log cannot be read
    pub async fn refresh(&self, end: DateTime<Utc>) -> AppResult<usize> {
        let loaded = self.log_store.load_until(end).await?;
        let fetched = loaded.len();
        let added = self.cache.merge(loaded).await;
        debug!(fetched, added, "therapy snapshot cache refreshed");
        Ok(added)
    }

    /// Refresh the cache and resolve every hour of `[start, end]`
    ///
    /// # Errors
    ///
    /// Returns a storage error if the remote log cannot be read
    pub async fn run(&self, start: DateTime<Utc>, end: DateTime<Utc>, tz: Tz) -> AppResult<BackfillOutcome> {
        self.refresh(end).await?;
        let timeline = self.cache.timeline().await;
        let hours = backfill_hours(&timeline, start, end, tz);
        info!(
            therapy.snapshots = timeline.len(),
            therapy.hours = hours.len(),
            window_start = %start,
            window_end = %end,
            "therapy backfill computed"
        );
        Ok(BackfillOutcome {
            window_start: start,
            window_end: end,
            snapshots: timeline.len(),
            hours,
        })
    }
}
