// ABOUTME: Environment configuration for the sync pipeline
// ABOUTME: Parses INSITE_* variables into a validated SyncConfig with typed defaults
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Environment-based configuration for sync passes

use chrono_tz::Tz;
use insite_analytics::GlycemicThresholds;
use insite_core::constants::{glucose, storage, therapy};
use insite_core::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// Account namespace in the document store
pub const ENV_ACCOUNT_ID: &str = "INSITE_ACCOUNT_ID";
/// IANA zone for local hours and days
pub const ENV_TIMEZONE: &str = "INSITE_TIMEZONE";
/// uROC target glucose
pub const ENV_TARGET_BG: &str = "INSITE_TARGET_BG";
/// Percent-low threshold
pub const ENV_LOW_BG: &str = "INSITE_LOW_BG";
/// Percent-high threshold
pub const ENV_HIGH_BG: &str = "INSITE_HIGH_BG";
/// Operations per committed batch
pub const ENV_BATCH_SIZE: &str = "INSITE_BATCH_SIZE";
/// Deadline per sync branch
pub const ENV_BRANCH_TIMEOUT_SECS: &str = "INSITE_BRANCH_TIMEOUT_SECS";
/// Deadline per source query and per batch commit
pub const ENV_QUERY_TIMEOUT_SECS: &str = "INSITE_QUERY_TIMEOUT_SECS";
/// Bound on per-bin sub-queries in flight
pub const ENV_MAX_CONCURRENT_QUERIES: &str = "INSITE_MAX_CONCURRENT_QUERIES";
/// Therapy look-back buffer
pub const ENV_BACKFILL_BUFFER_HOURS: &str = "INSITE_BACKFILL_BUFFER_HOURS";
/// Checkpoint policy
pub const ENV_CHECKPOINT_POLICY: &str = "INSITE_CHECKPOINT_POLICY";
/// Directory for checkpoint and profile files
pub const ENV_STATE_DIR: &str = "INSITE_STATE_DIR";

const DEFAULT_ACCOUNT_ID: &str = "local";
const DEFAULT_BRANCH_TIMEOUT_SECS: u64 = 120;
const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_CONCURRENT_QUERIES: usize = 16;

/// When the metric sync checkpoint may advance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckpointPolicy {
    /// Advance after every pass, even when branches failed
    #[default]
    Lenient,
    /// Hold the checkpoint when any metric branch failed or timed out
    HoldOnFailure,
}

impl FromStr for CheckpointPolicy {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "lenient" => Ok(Self::Lenient),
            "hold_on_failure" | "hold-on-failure" | "hold" => Ok(Self::HoldOnFailure),
            other => Err(AppError::config_invalid(
                ENV_CHECKPOINT_POLICY,
                format!("unknown policy '{other}', expected lenient or hold_on_failure"),
            )),
        }
    }
}

impl fmt::Display for CheckpointPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lenient => write!(f, "lenient"),
            Self::HoldOnFailure => write!(f, "hold_on_failure"),
        }
    }
}

/// Settings for one sync process
#[derive(Debug, Clone, PartialEq)]
pub struct SyncConfig {
    /// Account namespace in the document store
    pub account_id: String,
    /// Zone for local hours and days
    pub timezone: Tz,
    /// uROC target glucose in mg/dL
    pub target_bg: f64,
    /// Percent low/high thresholds
    pub thresholds: GlycemicThresholds,
    /// Operations per committed batch
    pub batch_size: usize,
    /// Deadline per sync branch
    pub branch_timeout: Duration,
    /// Deadline per source query and per batch commit
    pub query_timeout: Duration,
    /// Bound on concurrent per-bin sub-queries within a branch
    pub max_concurrent_queries: usize,
    /// Look-back applied before every therapy backfill window
    pub backfill_buffer_hours: i64,
    /// When the metric checkpoint advances
    pub checkpoint_policy: CheckpointPolicy,
    /// Directory holding the checkpoint and profile files
    pub state_dir: PathBuf,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            account_id: DEFAULT_ACCOUNT_ID.to_owned(),
            timezone: Tz::UTC,
            target_bg: glucose::DEFAULT_TARGET_BG,
            thresholds: GlycemicThresholds::default(),
            batch_size: storage::DEFAULT_BATCH_SIZE,
            branch_timeout: Duration::from_secs(DEFAULT_BRANCH_TIMEOUT_SECS),
            query_timeout: Duration::from_secs(DEFAULT_QUERY_TIMEOUT_SECS),
            max_concurrent_queries: DEFAULT_MAX_CONCURRENT_QUERIES,
            backfill_buffer_hours: therapy::DEFAULT_BACKFILL_BUFFER_HOURS,
            checkpoint_policy: CheckpointPolicy::Lenient,
            state_dir: default_state_dir(),
        }
    }
}

impl SyncConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns `ConfigInvalid` when a variable is present but unparsable, or
    /// when the resulting values fail [`SyncConfig::validate`].
    pub fn from_env() -> AppResult<Self> {
        let defaults = Self::default();

        let timezone = match env::var(ENV_TIMEZONE) {
            Ok(name) => name.parse::<Tz>().map_err(|_| {
                AppError::config_invalid(ENV_TIMEZONE, format!("unknown time zone '{name}'"))
            })?,
            Err(_) => defaults.timezone,
        };
        let low = parse_env(ENV_LOW_BG, defaults.thresholds.low)?;
        let high = parse_env(ENV_HIGH_BG, defaults.thresholds.high)?;
        let thresholds = GlycemicThresholds::new(low, high)
            .map_err(|error| AppError::config_invalid(ENV_LOW_BG, error.message))?;

        let config = Self {
            account_id: env::var(ENV_ACCOUNT_ID).unwrap_or(defaults.account_id),
            timezone,
            target_bg: parse_env(ENV_TARGET_BG, defaults.target_bg)?,
            thresholds,
            batch_size: parse_env(ENV_BATCH_SIZE, defaults.batch_size)?,
            branch_timeout: Duration::from_secs(parse_env(
                ENV_BRANCH_TIMEOUT_SECS,
                DEFAULT_BRANCH_TIMEOUT_SECS,
            )?),
            query_timeout: Duration::from_secs(parse_env(
                ENV_QUERY_TIMEOUT_SECS,
                DEFAULT_QUERY_TIMEOUT_SECS,
            )?),
            max_concurrent_queries: parse_env(
                ENV_MAX_CONCURRENT_QUERIES,
                defaults.max_concurrent_queries,
            )?,
            backfill_buffer_hours: parse_env(
                ENV_BACKFILL_BUFFER_HOURS,
                defaults.backfill_buffer_hours,
            )?,
            checkpoint_policy: parse_env(ENV_CHECKPOINT_POLICY, defaults.checkpoint_policy)?,
            state_dir: env::var(ENV_STATE_DIR).map_or(defaults.state_dir, PathBuf::from),
        };

        config.validate()?;
        info!(
            account_id = %config.account_id,
            timezone = %config.timezone,
            checkpoint_policy = %config.checkpoint_policy,
            "sync configuration loaded"
        );
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns `ConfigInvalid` naming the first offending variable.
    pub fn validate(&self) -> AppResult<()> {
        if self.account_id.trim().is_empty() {
            return Err(AppError::config_invalid(ENV_ACCOUNT_ID, "must not be empty"));
        }
        if !(self.target_bg.is_finite() && self.target_bg > 0.0) {
            return Err(AppError::config_invalid(
                ENV_TARGET_BG,
                format!("{} is not a positive glucose value", self.target_bg),
            ));
        }
        if self.thresholds.low >= self.thresholds.high {
            return Err(AppError::config_invalid(
                ENV_LOW_BG,
                format!(
                    "low threshold {} must be below high threshold {}",
                    self.thresholds.low, self.thresholds.high
                ),
            ));
        }
        if !(1..=storage::MAX_BATCH_SIZE).contains(&self.batch_size) {
            return Err(AppError::config_invalid(
                ENV_BATCH_SIZE,
                format!(
                    "{} is outside 1..={}",
                    self.batch_size,
                    storage::MAX_BATCH_SIZE
                ),
            ));
        }
        if self.branch_timeout.is_zero() {
            return Err(AppError::config_invalid(ENV_BRANCH_TIMEOUT_SECS, "must be positive"));
        }
        if self.query_timeout.is_zero() {
            return Err(AppError::config_invalid(ENV_QUERY_TIMEOUT_SECS, "must be positive"));
        }
        if self.backfill_buffer_hours < 0 {
            return Err(AppError::config_invalid(
                ENV_BACKFILL_BUFFER_HOURS,
                "must not be negative",
            ));
        }
        if self.max_concurrent_queries == 0 {
            return Err(AppError::config_invalid(
                ENV_MAX_CONCURRENT_QUERIES,
                "must be at least 1",
            ));
        }
        Ok(())
    }

    /// Path of the persisted sync checkpoint
    #[must_use]
    pub fn checkpoint_path(&self) -> PathBuf {
        self.state_dir.join("checkpoint.json")
    }

    /// Path of the saved therapy profiles
    #[must_use]
    pub fn profiles_path(&self) -> PathBuf {
        self.state_dir.join("profiles.json")
    }

    /// Get a summary of the configuration for logging
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "InSite Sync Configuration:\n\
             - Account: {}\n\
             - Time zone: {}\n\
             - Target BG: {}\n\
             - Low/High: {}/{}\n\
             - Batch size: {}\n\
             - Branch timeout: {}s\n\
             - Query timeout: {}s\n\
             - Max concurrent queries: {}\n\
             - Backfill buffer: {}h\n\
             - Checkpoint policy: {}\n\
             - State dir: {}",
            self.account_id,
            self.timezone,
            self.target_bg,
            self.thresholds.low,
            self.thresholds.high,
            self.batch_size,
            self.branch_timeout.as_secs(),
            self.query_timeout.as_secs(),
            self.max_concurrent_queries,
            self.backfill_buffer_hours,
            self.checkpoint_policy,
            self.state_dir.display()
        )
    }
}

/// Platform data directory for InSite state, falling back to the temp dir
#[must_use]
pub fn default_state_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(env::temp_dir)
        .join("insite")
}

fn parse_env<T>(key: &str, default: T) -> AppResult<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|error| AppError::config_invalid(key, format!("'{raw}': {error}"))),
        Err(_) => Ok(default),
    }
}
