// ABOUTME: Structured error types for health data source queries
// ABOUTME: Carries retry classification so guards and circuit breakers can react
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use thiserror::Error;

use super::{AppError, ErrorCode};

/// Errors reported by a health data source.
///
/// A failure is a value on one query; it never unwinds the sync pass.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    /// The source cannot be reached or is not available on this device
    #[error("{provider} is unavailable: {reason}")]
    Unavailable {
        /// Source name
        provider: String,
        /// Why the source is unavailable
        reason: String,
    },

    /// The user has not authorized access to the requested data
    #[error("{provider} denied access to {metric}")]
    Unauthorized {
        /// Source name
        provider: String,
        /// Metric that was refused
        metric: String,
    },

    /// A query executed but returned an error
    #[error("{provider} query for {metric} failed: {reason}")]
    QueryFailed {
        /// Source name
        provider: String,
        /// Queried metric
        metric: String,
        /// Failure details
        reason: String,
    },

    /// A query exceeded its deadline
    #[error("{operation} timed out after {seconds}s")]
    Timeout {
        /// Operation description
        operation: String,
        /// Deadline that elapsed
        seconds: u64,
    },

    /// Circuit breaker is open; calls fail fast
    #[error("circuit open for {provider}, retry after {retry_after_secs}s")]
    CircuitBreakerOpen {
        /// Source name
        provider: String,
        /// Seconds until a recovery probe is allowed
        retry_after_secs: u64,
    },

    /// The query itself is malformed (empty window, unsupported bucket)
    #[error("invalid query: {0}")]
    InvalidQuery(String),
}

impl ProviderError {
    /// Whether retrying the same query may succeed
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Unavailable { .. } | Self::QueryFailed { .. } | Self::Timeout { .. }
        )
    }

    /// Create a query failure
    #[must_use]
    pub fn query_failed(
        provider: impl Into<String>,
        metric: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::QueryFailed {
            provider: provider.into(),
            metric: metric.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for health data source operations
pub type ProviderResult<T> = Result<T, ProviderError>;

impl From<ProviderError> for AppError {
    fn from(error: ProviderError) -> Self {
        let code = match &error {
            ProviderError::Unavailable { .. } | ProviderError::CircuitBreakerOpen { .. } => {
                ErrorCode::ExternalServiceUnavailable
            }
            ProviderError::Unauthorized { .. } => ErrorCode::ExternalAuthFailed,
            ProviderError::QueryFailed { .. } => ErrorCode::ExternalServiceError,
            ProviderError::Timeout { .. } => ErrorCode::ExternalTimeout,
            ProviderError::InvalidQuery(_) => ErrorCode::InvalidInput,
        };
        Self::new(code, error.to_string()).with_source(error)
    }
}
