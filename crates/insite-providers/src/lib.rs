// ABOUTME: Health data source boundary for the InSite sync pipeline
// ABOUTME: Source trait and query types, circuit breaker, retry utilities, and a synthetic source
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Health data source abstractions.
//!
//! The pipeline reads through [`HealthDataSource`]. Production builds wrap a
//! platform source in [`GuardedSource`]; tests and the CLI demo use
//! [`SyntheticHealthSource`] filled by [`SyntheticSeeder`].

#![deny(unsafe_code)]

/// Circuit breaker pattern for source resilience
pub mod circuit_breaker;
/// Core source trait and query types
pub mod core;
/// Deadline, retry, and breaker decorator
pub mod guarded;
/// Deterministic data generator for the synthetic source
pub mod seed;
/// In-memory source with failure and latency injection
pub mod synthetic;
/// Retry and deadline helpers
pub mod utils;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use self::core::{
    bucket_statistics, BucketStatistic, BucketWidth, CategoryMetric, CategorySample,
    CategoryValue, FlowLevel, HealthDataSource, QuantityMetric, QuantitySample, SleepState,
    SourceMetric, StatisticsQuery,
};
pub use guarded::{GuardConfig, GuardedSource};
pub use insite_core::errors::{ProviderError, ProviderResult};
pub use seed::{SeedSummary, SyntheticSeeder, DEFAULT_SEED_DAYS};
pub use synthetic::{SyntheticHealthSource, SYNTHETIC_SOURCE_NAME};
pub use utils::{
    with_deadline, with_retry, with_retry_default, RetryBackoffConfig, ENV_RETRY_BASE_DELAY_MS,
    ENV_RETRY_JITTER_FACTOR, ENV_RETRY_MAX_ATTEMPTS, ENV_RETRY_MAX_DELAY_MS,
};
