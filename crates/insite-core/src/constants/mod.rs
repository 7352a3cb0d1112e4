// ABOUTME: Shared constants for glucose modelling, batching, and sync defaults
// ABOUTME: Single source of truth for numeric tunables used across the workspace
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Constants grouped by concern.

/// Glucose trajectory model and rate-of-change analytics
pub mod glucose {
    /// Amplitude of the hyperglycemic decay curve
    pub const DECAY_AMPLITUDE: f64 = 385.96;
    /// Rate constant of the hyperglycemic decay curve (per model minute)
    pub const DECAY_RATE: f64 = 0.017;
    /// Logistic steepness of the hypoglycemic recovery curve
    pub const RECOVERY_STEEPNESS: f64 = 0.2;
    /// Midpoint of the hypoglycemic recovery curve (model minutes)
    pub const RECOVERY_MIDPOINT: f64 = 43.5;
    /// Power applied to the shifted recovery time parameter
    pub const RECOVERY_POWER: f64 = 0.8;
    /// Default target BG in mg/dL
    pub const DEFAULT_TARGET_BG: f64 = 110.0;
    /// Default low threshold in mg/dL (strictly below counts as low)
    pub const DEFAULT_LOW_BG: f64 = 80.0;
    /// Default high threshold in mg/dL (strictly above counts as high)
    pub const DEFAULT_HIGH_BG: f64 = 180.0;
}

/// Newton-Raphson defaults
pub mod solver {
    /// Convergence and degenerate-derivative tolerance
    pub const DEFAULT_TOLERANCE: f64 = 1e-6;
    /// Iteration bound; exceeding it is reported as no solution
    pub const MAX_ITERATIONS: usize = 1_000;
}

/// Time bucketing
pub mod time {
    /// Seconds per hour
    pub const SECONDS_PER_HOUR: i64 = 3_600;
    /// Seconds per day
    pub const SECONDS_PER_DAY: i64 = 86_400;
    /// Hours in a day, also the divisor of per-day exercise averages
    pub const HOURS_PER_DAY: u8 = 24;
    /// Length of trailing averages for heart rate and active energy
    pub const TRAILING_AVERAGE_DAYS: i64 = 7;
    /// Default look-back when no sync checkpoint exists (months)
    pub const DEFAULT_LOOKBACK_MONTHS: u32 = 1;
}

/// Document store limits
pub mod storage {
    /// Default operations per committed batch
    pub const DEFAULT_BATCH_SIZE: usize = 450;
    /// Hard upper bound on operations per committed batch
    pub const MAX_BATCH_SIZE: usize = 500;
    /// Root collection for per-account documents
    pub const ACCOUNTS_COLLECTION: &str = "accounts";
    /// Leaf collection holding documents under a kind/subpath
    pub const ITEMS_COLLECTION: &str = "items";
    /// Collection holding the append-only therapy snapshot log
    pub const THERAPY_LOG_COLLECTION: &str = "therapy_settings_log";
}

/// Site change tracking
pub mod site_changes {
    /// Local days recomputed after a site change is recorded
    pub const DEFAULT_BACKFILL_DAYS: u32 = 14;
}

/// Default profile values used when nothing has been saved
pub mod therapy {
    /// Name of the built-in profile
    pub const DEFAULT_PROFILE_NAME: &str = "Default";
    /// Carb ratio of the built-in profile (g/U)
    pub const DEFAULT_CARB_RATIO: f64 = 1.0;
    /// Basal rate of the built-in profile (U/h)
    pub const DEFAULT_BASAL_RATE: f64 = 0.1;
    /// Insulin sensitivity of the built-in profile (mg/dL per U)
    pub const DEFAULT_INSULIN_SENSITIVITY: f64 = 50.0;
    /// Look-back applied before every backfill window (hours)
    pub const DEFAULT_BACKFILL_BUFFER_HOURS: i64 = 24;
}
