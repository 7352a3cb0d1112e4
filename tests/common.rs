// ABOUTME: Shared test utilities and setup functions for integration tests
// ABOUTME: Provides logging init, fixed instants, sample builders, and orchestrator wiring
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence
#![allow(
    dead_code,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate,
    clippy::unwrap_used
)]
//! Shared test utilities for `insite_sync`
//!
//! This module provides common test setup functions to reduce duplication
//! across integration tests.

use chrono::{DateTime, Duration, Utc};
use insite_core::models::{HourRange, SyncCheckpoint, TherapyProfile, TherapySnapshot};
use insite_providers::{HealthDataSource, QuantityMetric, QuantitySample, SyntheticHealthSource};
use insite_sync::checkpoint::InMemoryCheckpointStore;
use insite_sync::config::SyncConfig;
use insite_sync::persistence::{items_collection, DocumentStore, InMemoryDocumentStore};
use insite_sync::sync::SyncOrchestrator;
use insite_sync::therapy::{SnapshotLog, TherapyLogStore};
use std::sync::{Arc, Once};

/// Account used by every integration test
pub const TEST_ACCOUNT: &str = "test-account";

static INIT_LOGGER: Once = Once::new();

/// Initialize quiet logging for tests (call once per test process)
pub fn init_test_logging() {
    INIT_LOGGER.call_once(|| {
        // TEST_LOG controls the level; quiet by default
        let log_level = match std::env::var("TEST_LOG").as_deref() {
            Ok("TRACE") => tracing::Level::TRACE,
            Ok("DEBUG") => tracing::Level::DEBUG,
            Ok("INFO") => tracing::Level::INFO,
            Ok("WARN" | "ERROR") | _ => tracing::Level::WARN,
        };

        tracing_subscriber::fmt()
            .with_max_level(log_level)
            .with_test_writer()
            .init();
    });
}

/// Parse an RFC 3339 instant
pub fn at(text: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(text).unwrap().with_timezone(&Utc)
}

/// Config for the test account with short deadlines
pub fn test_config() -> SyncConfig {
    SyncConfig {
        account_id: TEST_ACCOUNT.to_owned(),
        branch_timeout: std::time::Duration::from_secs(5),
        query_timeout: std::time::Duration::from_secs(2),
        max_concurrent_queries: 4,
        ..SyncConfig::default()
    }
}

/// Checkpoint whose both dates sit `hours` before `now`
pub fn checkpoint_hours_before(now: DateTime<Utc>, hours: i64) -> SyncCheckpoint {
    let last = now - Duration::hours(hours);
    SyncCheckpoint {
        last_sync_date: Some(last),
        last_therapy_backfill_date: Some(last),
    }
}

/// Single-range profile with the given carb ratio
pub fn flat_profile(name: &str, carb_ratio: f64) -> TherapyProfile {
    TherapyProfile::new(name, vec![HourRange::new(0, 23, carb_ratio, 0.8, 45.0)])
}

/// Add one reading of `metric` every 15 minutes across `[start, end)`
pub fn add_readings(
    source: &SyntheticHealthSource,
    metric: QuantityMetric,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    value: impl Fn(DateTime<Utc>) -> f64,
) {
    let mut samples = Vec::new();
    let mut cursor = start;
    while cursor < end {
        samples.push(QuantitySample::at(metric, cursor, value(cursor)));
        cursor += Duration::minutes(15);
    }
    source.add_quantity_samples(samples);
}

/// `accounts/{TEST_ACCOUNT}/{kind}/{subpath}/items`
pub fn items(kind: &str, subpath: &str) -> String {
    items_collection(TEST_ACCOUNT, kind, subpath)
}

/// Everything one orchestrator test needs to inspect after a pass
pub struct Harness {
    pub source: Arc<SyntheticHealthSource>,
    pub memory: InMemoryDocumentStore,
    pub checkpoints: InMemoryCheckpointStore,
    pub cache: SnapshotLog,
    pub orchestrator: SyncOrchestrator,
}

impl Harness {
    /// Wire an orchestrator over a fresh store and the given source and checkpoint
    pub fn new(config: SyncConfig, source: Arc<SyntheticHealthSource>, checkpoint: SyncCheckpoint) -> Self {
        init_test_logging();
        let memory = InMemoryDocumentStore::new();
        Self::with_store(config, source, checkpoint, memory)
    }

    /// Wire an orchestrator over an existing store
    pub fn with_store(
        config: SyncConfig,
        source: Arc<SyntheticHealthSource>,
        checkpoint: SyncCheckpoint,
        memory: InMemoryDocumentStore,
    ) -> Self {
        let checkpoints = InMemoryCheckpointStore::with_checkpoint(checkpoint);
        let cache = SnapshotLog::new();
        let health: Arc<dyn HealthDataSource> = source.clone();
        let orchestrator = SyncOrchestrator::new(
            config,
            health,
            Arc::new(memory.clone()),
            Arc::new(checkpoints.clone()),
            cache.clone(),
        );
        Self {
            source,
            memory,
            checkpoints,
            cache,
            orchestrator,
        }
    }

    /// Store handle as the trait object
    pub fn store(&self) -> Arc<dyn DocumentStore> {
        Arc::new(self.memory.clone())
    }

    /// Write a snapshot of `profile` effective at `timestamp` to the remote log
    pub async fn log_profile(&self, profile: &TherapyProfile, timestamp: DateTime<Utc>) -> TherapySnapshot {
        let snapshot = TherapySnapshot::capture(profile, timestamp);
        TherapyLogStore::new(self.store(), TEST_ACCOUNT)
            .append(&snapshot)
            .await
            .unwrap();
        snapshot
    }
}
