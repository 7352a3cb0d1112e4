// ABOUTME: Core types and constants for the InSite health sync pipeline
// ABOUTME: Foundation crate with error handling, data models, time buckets, and constants
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![deny(unsafe_code)]

//! # InSite Core
//!
//! Foundation crate providing shared types for the sync pipeline. It has no
//! async code and no I/O, so every other crate in the workspace can depend on it.
//!
//! ## Modules
//!
//! - **errors**: `AppError`, `ErrorCode`, and `ProviderError`
//! - **constants**: glucose model constants, batching limits, and defaults
//! - **models**: therapy configuration, metric records, and the sync checkpoint
//! - **time**: UTC hour buckets, local days, and document ID formatting

/// Unified error handling system with standard error codes
pub mod errors;

/// Application constants organized by domain
pub mod constants;

/// Core data models
pub mod models;

/// UTC bucket and local-day helpers
pub mod time;

pub use errors::{AppError, AppResult, ErrorCode, ProviderError, ProviderResult};
