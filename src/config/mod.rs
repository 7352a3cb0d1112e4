// ABOUTME: Configuration module for sync pipeline settings
// ABOUTME: Re-exports the environment-driven SyncConfig and checkpoint policy
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence
//! Configuration module for InSite sync
//!
//! All settings come from environment variables with typed defaults; there is
//! no configuration file.

/// Environment configuration
pub mod environment;

pub use environment::{default_state_dir, CheckpointPolicy, SyncConfig};
