// ABOUTME: Main library entry point for the InSite health data sync pipeline
// ABOUTME: Wires configuration, therapy settings, metric fetchers, uploads, and the sync orchestrator
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

// Crate-level attributes:
// - deny(unsafe_code): Zero-tolerance unsafe policy.
#![deny(unsafe_code)]

//! # `InSite` Sync
//!
//! Pulls health metrics from a health data source, buckets them into hourly
//! and daily series, enriches every record with the therapy profile that was
//! active at the time, and writes the results to a hierarchical document store
//! under stable, idempotent document IDs.
//!
//! ## Architecture
//!
//! - **Config**: environment-driven [`config::SyncConfig`]
//! - **Therapy**: local profile store, append-only snapshot log, and the hourly
//!   therapy settings backfill
//! - **Streams**: one fetcher per metric family, each building its records from
//!   bucketed statistics
//! - **Persistence**: document store boundary and the batched uploader
//! - **Sync**: the orchestrator running every branch concurrently and moving
//!   the checkpoints
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use insite_providers::SyntheticHealthSource;
//! use insite_sync::checkpoint::InMemoryCheckpointStore;
//! use insite_sync::config::SyncConfig;
//! use insite_sync::persistence::InMemoryDocumentStore;
//! use insite_sync::sync::SyncOrchestrator;
//! use insite_sync::therapy::SnapshotLog;
//!
//! #[tokio::main]
//! async fn main() -> insite_core::errors::AppResult<()> {
//!     let config = SyncConfig::from_env()?;
//!     let orchestrator = SyncOrchestrator::new(
//!         config,
//!         Arc::new(SyntheticHealthSource::new()),
//!         Arc::new(InMemoryDocumentStore::new()),
//!         Arc::new(InMemoryCheckpointStore::new()),
//!         SnapshotLog::new(),
//!     );
//!     let report = orchestrator.sync().await?;
//!     println!("{} documents written", report.documents_written());
//!     Ok(())
//! }
//! ```

/// Sync checkpoint persistence
pub mod checkpoint;

/// Environment-driven configuration
pub mod config;

/// Structured logging setup
pub mod logging;

/// Document store boundary and uploader
pub mod persistence;

/// Infusion site change tracking
pub mod site_changes;

/// Metric fetchers
pub mod streams;

/// Sync orchestration and reporting
pub mod sync;

/// Therapy profiles, snapshots, and backfill
pub mod therapy;
