//! Custom error types for the idler.
//!
//! This module defines explicit enum error types as per coding guidelines.
//! No `Box<dyn Error>`, no `anyhow::Result` - all errors are strongly typed.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type for the idler.
/// All errors are explicit variants - no catch-all or generic handling.
#[derive(Debug, Error)]
pub enum IdlerError {
    // =========================================================================
    // Configuration Errors - Fail-Fast on Invalid Config
    // =========================================================================
    #[error("Hard validation error: {0}")]
    HardValidation(#[from] HardValidationError),

    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    #[error("Configuration parse error: {message}")]
    ConfigParse { message: String },

    #[error("Unable to read credential file {path}: {source}")]
    Credentials {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // =========================================================================
    // Collaborator Errors - Recovered per function, KEEP for the round
    // =========================================================================
    #[error("Gateway request '{operation}' failed: {message}")]
    Gateway {
        operation: &'static str,
        message: String,
    },

    #[error("Metric source read for function {function} failed: {message}")]
    MetricSource { function: String, message: String },

    #[error("Malformed invocation counter for function {function}: {value}")]
    MalformedCounter { function: String, value: String },

    #[error("Operation '{operation}' timed out after {after_ms}ms")]
    Timeout { operation: &'static str, after_ms: u64 },

    // =========================================================================
    // System Errors
    // =========================================================================
    #[error("IO error: {context} - {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
}

impl IdlerError {
    /// Whether the error came from a gateway or metric source call.
    /// Such errors only affect the function being evaluated.
    pub fn is_collaborator(&self) -> bool {
        matches!(
            self,
            IdlerError::Gateway { .. }
                | IdlerError::MetricSource { .. }
                | IdlerError::MalformedCounter { .. }
                | IdlerError::Timeout { .. }
        )
    }
}

/// Hard validation errors cause immediate process termination.
/// Used when configuration is invalid and the idler cannot safely start.
#[derive(Debug, Error)]
pub enum HardValidationError {
    #[error("Missing required field: {field} in {context}")]
    MissingRequiredField {
        field: &'static str,
        context: String,
    },

    #[error("Invalid field value: {field} = {value} - {reason}")]
    InvalidFieldValue {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("Invalid function name: {name} - {reason}")]
    InvalidFunctionName { name: String, reason: String },
}

/// Result type alias using IdlerError.
pub type IdlerResult<T> = Result<T, IdlerError>;
