// ABOUTME: Persisted sync checkpoint holding the last sync and last therapy backfill instants
// ABOUTME: Computes the next sync window with a one-month default look-back
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::time::DEFAULT_LOOKBACK_MONTHS;

/// Process-wide sync state, read at the start of a pass and written once after it
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncCheckpoint {
    /// End of the last committed metric sync window
    pub last_sync_date: Option<DateTime<Utc>>,
    /// End of the last therapy backfill window
    pub last_therapy_backfill_date: Option<DateTime<Utc>>,
}

impl SyncCheckpoint {
    /// Start of the next metric window: the last sync, or one month before `now`
    #[must_use]
    pub fn sync_window_start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.last_sync_date.unwrap_or_else(|| default_lookback(now))
    }

    /// Start of the next backfill window before the look-back buffer is applied
    #[must_use]
    pub fn backfill_window_start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.last_therapy_backfill_date
            .unwrap_or_else(|| default_lookback(now))
    }
}

fn default_lookback(now: DateTime<Utc>) -> DateTime<Utc> {
    now.checked_sub_months(Months::new(DEFAULT_LOOKBACK_MONTHS))
        .unwrap_or(now)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_window_is_one_month() {
        let now = DateTime::parse_from_rfc3339("2025-03-31T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let checkpoint = SyncCheckpoint::default();
        let start = checkpoint.sync_window_start(now);
        assert_eq!(start.to_rfc3339(), "2025-02-28T12:00:00+00:00");
    }

    #[test]
    fn test_existing_checkpoint_wins() {
        let now = Utc::now();
        let last = now - chrono::Duration::hours(3);
        let checkpoint = SyncCheckpoint {
            last_sync_date: Some(last),
            last_therapy_backfill_date: None,
        };
        assert_eq!(checkpoint.sync_window_start(now), last);
        assert!(checkpoint.backfill_window_start(now) < last);
    }
}
