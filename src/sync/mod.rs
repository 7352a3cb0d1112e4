// ABOUTME: Sync pass coordination: orchestrator and per-pass report
// ABOUTME: Re-exports SyncOrchestrator, SyncReport, SyncBranch, and BranchOutcome
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

/// Concurrent fan-out, enrichment, upload, and checkpointing
pub mod orchestrator;
/// Per-pass outcome
pub mod report;

pub use orchestrator::{tag_profiles, SyncOrchestrator};
pub use report::{BranchOutcome, SyncBranch, SyncReport};
