// ABOUTME: Glucose analytics: root finding, trajectory model, and rate-of-change metrics
// ABOUTME: Synchronous numeric code shared by the sync pipeline, CLI, and benchmarks
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![deny(unsafe_code)]

//! # InSite Analytics
//!
//! Pure, non-suspending computations. Nothing here performs I/O, so the async
//! branches of a sync pass can call into it inline.

/// Root finder and trajectory model
pub mod algorithms;

/// Percent low/high and averages
pub mod glycemic;

/// Unexpected rate of change per hourly bucket
pub mod uroc;

pub use algorithms::{GlucoseTrajectory, NewtonRaphson};
pub use glycemic::{mean, GlycemicThresholds};
pub use uroc::{compute_hourly_uroc, URocCalculator, URocEstimate};
