// ABOUTME: Glycemic range statistics over raw glucose readings
// ABOUTME: Percent below/above thresholds and simple averages for hourly buckets
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use serde::{Deserialize, Serialize};

use insite_core::constants::glucose::{DEFAULT_HIGH_BG, DEFAULT_LOW_BG};
use insite_core::errors::{AppError, AppResult};

/// Low and high glucose thresholds in mg/dL
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GlycemicThresholds {
    /// Readings strictly below this are low
    pub low: f64,
    /// Readings strictly above this are high
    pub high: f64,
}

impl Default for GlycemicThresholds {
    fn default() -> Self {
        Self {
            low: DEFAULT_LOW_BG,
            high: DEFAULT_HIGH_BG,
        }
    }
}

impl GlycemicThresholds {
    /// Build thresholds, requiring `low < high`
    ///
    /// # Errors
    ///
    /// Returns `ValueOutOfRange` if either bound is not finite or `low >= high`.
    pub fn new(low: f64, high: f64) -> AppResult<Self> {
        if !(low.is_finite() && high.is_finite()) || low >= high {
            return Err(AppError::out_of_range(format!(
                "low threshold {low} must be below high threshold {high}"
            )));
        }
        Ok(Self { low, high })
    }

    /// Percentages (0-100) of readings below `low` and above `high`.
    ///
    /// `None` for an empty slice so callers can skip hours without data.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn percent_low_high(&self, readings: &[f64]) -> Option<(f64, f64)> {
        if readings.is_empty() {
            return None;
        }
        let total = readings.len() as f64;
        let low = readings.iter().filter(|value| **value < self.low).count() as f64;
        let high = readings.iter().filter(|value| **value > self.high).count() as f64;
        Some((low / total * 100.0, high / total * 100.0))
    }
}

/// Arithmetic mean, `None` when empty
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}
