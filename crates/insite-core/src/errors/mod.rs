// ABOUTME: Unified error handling with standard error codes for the sync pipeline
// ABOUTME: Defines AppError, ErrorCode, and the AppResult alias used across crates
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Unified Error Handling System
//!
//! Every fallible operation in the workspace returns [`AppResult`]. Errors carry a
//! stable [`ErrorCode`] so that branch failures can be logged and reported with a
//! consistent shape, and an optional source for chaining.

/// Health data source errors
pub mod provider;

use serde::{Deserialize, Serialize};
use std::error::Error as StdError;
use std::fmt;

pub use provider::{ProviderError, ProviderResult};

/// Standard error codes used throughout the application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    // Validation (3000-3999)
    /// Input failed validation
    #[serde(rename = "INVALID_INPUT")]
    InvalidInput = 3000,
    /// A value is outside its permitted range
    #[serde(rename = "VALUE_OUT_OF_RANGE")]
    ValueOutOfRange = 3003,

    // Resource Management (4000-4999)
    /// Requested resource does not exist
    #[serde(rename = "RESOURCE_NOT_FOUND")]
    ResourceNotFound = 4000,
    /// Resource is temporarily unavailable
    #[serde(rename = "RESOURCE_UNAVAILABLE")]
    ResourceUnavailable = 4003,

    // External Services (5000-5999)
    /// External collaborator returned an error
    #[serde(rename = "EXTERNAL_SERVICE_ERROR")]
    ExternalServiceError = 5000,
    /// External collaborator could not be reached
    #[serde(rename = "EXTERNAL_SERVICE_UNAVAILABLE")]
    ExternalServiceUnavailable = 5001,
    /// External collaborator refused our credentials
    #[serde(rename = "EXTERNAL_AUTH_FAILED")]
    ExternalAuthFailed = 5002,
    /// External call exceeded its deadline
    #[serde(rename = "EXTERNAL_TIMEOUT")]
    ExternalTimeout = 5004,

    // Configuration (6000-6999)
    /// Generic configuration error
    #[serde(rename = "CONFIG_ERROR")]
    ConfigError = 6000,
    /// Configuration value could not be parsed or is inconsistent
    #[serde(rename = "CONFIG_INVALID")]
    ConfigInvalid = 6002,

    // Internal Errors (9000-9999)
    /// Unexpected internal failure
    #[serde(rename = "INTERNAL_ERROR")]
    InternalError = 9000,
    /// Document or file storage failure
    #[serde(rename = "STORAGE_ERROR")]
    StorageError = 9002,
    /// Serialization or deserialization failure
    #[serde(rename = "SERIALIZATION_ERROR")]
    SerializationError = 9003,
}

impl ErrorCode {
    /// Get a user-friendly description of this error
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::InvalidInput => "The provided input is invalid",
            Self::ValueOutOfRange => "The provided value is outside the acceptable range",
            Self::ResourceNotFound => "The requested resource was not found",
            Self::ResourceUnavailable => "The resource is temporarily unavailable",
            Self::ExternalServiceError => "An external service encountered an error",
            Self::ExternalServiceUnavailable => "An external service is currently unavailable",
            Self::ExternalAuthFailed => "Authentication with external service failed",
            Self::ExternalTimeout => "An external service did not respond in time",
            Self::ConfigError => "Configuration error encountered",
            Self::ConfigInvalid => "Configuration is invalid",
            Self::InternalError => "An internal error occurred",
            Self::StorageError => "Storage operation failed",
            Self::SerializationError => "Data serialization/deserialization failed",
        }
    }

    /// Whether a retry of the failed operation may succeed
    #[must_use]
    pub const fn is_transient(self) -> bool {
        matches!(
            self,
            Self::ResourceUnavailable
                | Self::ExternalServiceUnavailable
                | Self::ExternalTimeout
                | Self::StorageError
        )
    }
}

/// Unified error type for the application
#[derive(Debug)]
pub struct AppError {
    /// Error code
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Source error for error chaining
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl AppError {
    /// Create a new `AppError` with the given code and message
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Attach a source error for error chaining
    #[must_use]
    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Invalid input
    #[must_use]
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    /// Value outside its permitted range
    #[must_use]
    pub fn out_of_range(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValueOutOfRange, message)
    }

    /// Resource not found
    #[must_use]
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::ResourceNotFound,
            format!("{} not found", resource.into()),
        )
    }

    /// Configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigError, message)
    }

    /// Invalid configuration value
    #[must_use]
    pub fn config_invalid(key: &str, message: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::ConfigInvalid,
            format!("{key}: {}", message.into()),
        )
    }

    /// External service error
    #[must_use]
    pub fn external_service(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::ExternalServiceError,
            format!("{}: {}", service.into(), message.into()),
        )
    }

    /// Deadline exceeded on an external call
    #[must_use]
    pub fn timeout(operation: impl Into<String>, seconds: u64) -> Self {
        Self::new(
            ErrorCode::ExternalTimeout,
            format!("{} timed out after {seconds}s", operation.into()),
        )
    }

    /// Storage error
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::StorageError, message)
    }

    /// Serialization error
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::SerializationError, message)
    }

    /// Internal error
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.description(), self.message)
    }
}

impl StdError for AppError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_deref()
            .map(|source| source as &(dyn StdError + 'static))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(error: serde_json::Error) -> Self {
        Self::serialization(error.to_string()).with_source(error)
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::storage(error.to_string()).with_source(error)
    }
}

/// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_description_and_message() {
        let error = AppError::not_found("profile 'night'");
        assert_eq!(error.code, ErrorCode::ResourceNotFound);
        assert_eq!(
            error.to_string(),
            "The requested resource was not found: profile 'night' not found"
        );
    }

    #[test]
    fn test_transient_codes() {
        assert!(ErrorCode::ExternalTimeout.is_transient());
        assert!(ErrorCode::StorageError.is_transient());
        assert!(!ErrorCode::InvalidInput.is_transient());
        assert!(!ErrorCode::ConfigInvalid.is_transient());
    }

    #[test]
    fn test_serde_error_conversion_keeps_source() {
        let parse: Result<u32, _> = serde_json::from_str("not json");
        let error: AppError = parse.unwrap_err().into();
        assert_eq!(error.code, ErrorCode::SerializationError);
        assert!(error.source().is_some());
    }
}
