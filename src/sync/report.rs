// ABOUTME: Per-pass sync report: branch outcomes, upload summaries, and checkpoint movement
// ABOUTME: Serializable so the CLI can print it as JSON
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use crate::persistence::UploadSummary;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Concurrent branches of one sync pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncBranch {
    /// Hourly therapy settings projection
    TherapyBackfill,
    /// Glucose streams
    BloodGlucose,
    /// Heart rate streams
    HeartRate,
    /// Exercise streams
    Exercise,
    /// Cycle day
    Menstrual,
    /// Body mass
    BodyMass,
    /// Resting heart rate
    RestingHeartRate,
    /// Sleep minutes
    Sleep,
    /// Energy streams
    Energy,
}

impl SyncBranch {
    /// Metric branches, excluding the therapy backfill
    pub const METRICS: [Self; 8] = [
        Self::BloodGlucose,
        Self::HeartRate,
        Self::Exercise,
        Self::Menstrual,
        Self::BodyMass,
        Self::RestingHeartRate,
        Self::Sleep,
        Self::Energy,
    ];

    /// Name used in logs
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TherapyBackfill => "therapy_backfill",
            Self::BloodGlucose => "blood_glucose",
            Self::HeartRate => "heart_rate",
            Self::Exercise => "exercise",
            Self::Menstrual => "menstrual",
            Self::BodyMass => "body_mass",
            Self::RestingHeartRate => "resting_heart_rate",
            Self::Sleep => "sleep",
            Self::Energy => "energy",
        }
    }

    /// Whether this branch feeds the metric checkpoint
    #[must_use]
    pub const fn is_metric(self) -> bool {
        !matches!(self, Self::TherapyBackfill)
    }
}

impl fmt::Display for SyncBranch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a branch ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BranchOutcome {
    /// Branch produced records
    Completed {
        /// Records produced
        records: usize,
    },
    /// Branch returned an error
    Failed {
        /// Error text
        message: String,
    },
    /// Branch exceeded its deadline and was cancelled
    TimedOut {
        /// Deadline in seconds
        after_secs: u64,
    },
}

impl BranchOutcome {
    /// Whether the branch completed
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}

/// Summary of one sync pass
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncReport {
    /// Metric window start
    pub window_start: DateTime<Utc>,
    /// Metric window end
    pub window_end: DateTime<Utc>,
    /// Therapy backfill window start, after the look-back buffer
    pub backfill_start: DateTime<Utc>,
    /// Outcome per branch
    pub branches: BTreeMap<SyncBranch, BranchOutcome>,
    /// Upload result per `{kind}/{subpath}`
    pub uploads: BTreeMap<String, UploadSummary>,
    /// Snapshots in the therapy cache when records were enriched
    pub therapy_snapshots: usize,
    /// Whether `last_sync_date` moved to `window_end`
    pub sync_checkpoint_advanced: bool,
    /// Whether `last_therapy_backfill_date` moved to `window_end`
    pub backfill_checkpoint_advanced: bool,
}

impl SyncReport {
    /// Branches that failed or timed out
    #[must_use]
    pub fn failed_branches(&self) -> Vec<SyncBranch> {
        self.branches
            .iter()
            .filter(|(_, outcome)| !outcome.is_success())
            .map(|(branch, _)| *branch)
            .collect()
    }

    /// Whether any metric branch failed or timed out
    #[must_use]
    pub fn has_metric_failure(&self) -> bool {
        self.failed_branches().iter().any(|branch| branch.is_metric())
    }

    /// Documents written across every record kind
    #[must_use]
    pub fn documents_written(&self) -> usize {
        self.uploads.values().map(|summary| summary.documents).sum()
    }

    /// Batches that failed across every record kind
    #[must_use]
    pub fn batches_failed(&self) -> usize {
        self.uploads.values().map(|summary| summary.batches_failed).sum()
    }

    /// Whether every branch completed and every batch landed
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed_branches().is_empty() && self.batches_failed() == 0
    }
}
