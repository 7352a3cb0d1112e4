// ABOUTME: Unexpected rate of change (uROC) of blood glucose per hourly bucket
// ABOUTME: Compares the observed slope with the slope predicted by the trajectory model
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Unexpected Rate of Change
//!
//! For a bucket with a first reading `start` and last reading `end` over `dt`
//! seconds:
//!
//! 1. `real = (end - start) / dt`
//! 2. anchor `start` on the trajectory curve by solving `f(t0) = start` from `t0 = 0`
//! 3. `expected_end = f(t0 + dt / 60)` and `expected = (expected_end - start) / dt`
//! 4. `uroc = real - expected`, or `0` when the anchor cannot be solved
//!
//! Buckets missing a reading, or with a non-positive duration, are kept as gap
//! records with neither value set.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use insite_core::models::{HourlyBgData, HourlyBgURoc};

use crate::algorithms::{GlucoseTrajectory, NewtonRaphson};

/// Result of evaluating one bucket
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct URocEstimate {
    /// Observed rate in mg/dL per second
    pub real_roc: f64,
    /// Modelled rate in mg/dL per second, absent when unsolved
    pub expected_roc: Option<f64>,
    /// Modelled glucose at bucket end, absent when unsolved
    pub expected_end_bg: Option<f64>,
    /// Observed minus modelled rate, zero when unsolved
    pub uroc: f64,
}

/// Evaluates uROC against a fixed target
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct URocCalculator {
    target_bg: f64,
    solver: NewtonRaphson,
}

impl URocCalculator {
    /// Calculator for `target_bg` with the default solver
    #[must_use]
    pub fn new(target_bg: f64) -> Self {
        Self {
            target_bg,
            solver: NewtonRaphson::default(),
        }
    }

    /// Target the model converges to
    #[must_use]
    pub const fn target_bg(&self) -> f64 {
        self.target_bg
    }

    /// Evaluate a single bucket; `None` for a non-positive or non-finite duration
    #[must_use]
    pub fn estimate(&self, start_bg: f64, end_bg: f64, duration_secs: f64) -> Option<URocEstimate> {
        if !(duration_secs.is_finite() && duration_secs > 0.0) {
            return None;
        }
        let real_roc = (end_bg - start_bg) / duration_secs;
        let curve = GlucoseTrajectory::for_levels(start_bg, self.target_bg);
        let anchor = self.solver.solve(
            0.0,
            |t| curve.value(t) - start_bg,
            |t| curve.derivative(t),
        );

        let expected_end_bg = anchor
            .map(|solution| curve.value(solution.root + duration_secs / 60.0))
            .filter(|value| value.is_finite());
        let expected_roc = expected_end_bg.map(|end| (end - start_bg) / duration_secs);
        let uroc = expected_roc.map_or(0.0, |expected| real_roc - expected);

        Some(URocEstimate {
            real_roc,
            expected_roc,
            expected_end_bg,
            uroc,
        })
    }

    /// Evaluate one hourly bucket, emitting a gap record when it cannot be scored
    #[must_use]
    pub fn evaluate(&self, sample: &HourlyBgData) -> HourlyBgURoc {
        let estimate = match (sample.start_bg, sample.end_bg) {
            (Some(start_bg), Some(end_bg)) => {
                self.estimate(start_bg, end_bg, duration_secs(sample.start, sample.end))
            }
            _ => None,
        };
        HourlyBgURoc {
            start: sample.start,
            end: sample.end,
            uroc: estimate.map(|e| e.uroc),
            expected_end_bg: estimate.and_then(|e| e.expected_end_bg),
            therapy_profile_id: sample.therapy_profile_id,
        }
    }
}

/// Compute uROC for every hourly sample, one output per input in the same order
#[must_use]
pub fn compute_hourly_uroc(samples: &[HourlyBgData], target_bg: f64) -> Vec<HourlyBgURoc> {
    let calculator = URocCalculator::new(target_bg);
    samples.iter().map(|sample| calculator.evaluate(sample)).collect()
}

#[allow(clippy::cast_precision_loss)]
fn duration_secs(start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    (end - start).num_milliseconds() as f64 / 1_000.0
}
