// ABOUTME: Therapy configuration: local profiles, the versioned snapshot log, and hourly backfill
// ABOUTME: Provides the as-of join between timestamps and the therapy profile active at that time
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

/// Hourly projection of the snapshot log
pub mod backfill;
/// Snapshot cache, timeline, and remote log
pub mod log;
/// Local profile file
pub mod profile;
/// Profile activation and resolution
pub mod service;

pub use backfill::{backfill_hours, BackfillEngine, BackfillOutcome};
pub use log::{SnapshotLog, SnapshotTimeline, TherapyLogStore};
pub use profile::ProfileStore;
pub use service::TherapyService;
