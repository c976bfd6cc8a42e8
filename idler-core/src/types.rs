// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Newtype wrappers for validated inputs.
//!
//! Following the "Newtype" pattern in Rust to ensure valid state by construction.
//! All types validate their invariants at creation time.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::HardValidationError;

/// Maximum function name length accepted from the gateway.
const MAX_FUNCTION_NAME_LEN: usize = 63;

/// Validated function name.
/// Names are interpolated into gateway URL paths, so only
/// alphanumerics, hyphens, underscores and dots are accepted.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FunctionName(String);

impl FunctionName {
    /// Create a new FunctionName with validation.
    pub fn new(name: impl Into<String>) -> Result<Self, HardValidationError> {
        let name = name.into();

        if name.is_empty() {
            return Err(HardValidationError::InvalidFunctionName {
                name,
                reason: "Function name cannot be empty".to_string(),
            });
        }

        if name.len() > MAX_FUNCTION_NAME_LEN {
            let reason = format!(
                "Function name too long: {} chars (max {})",
                name.len(),
                MAX_FUNCTION_NAME_LEN
            );
            return Err(HardValidationError::InvalidFunctionName { name, reason });
        }

        if !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
        {
            return Err(HardValidationError::InvalidFunctionName {
                name,
                reason: "Function name must contain only ASCII alphanumerics, hyphens, underscores and dots".to_string(),
            });
        }

        Ok(Self(name))
    }

    /// Get the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FunctionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for FunctionName {
    type Error = HardValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<FunctionName> for String {
    fn from(name: FunctionName) -> Self {
        name.0
    }
}

/// Validated inactivity window.
/// A function must show no counter increase for this long before it may be
/// scaled to zero. Must be strictly positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct InactivityWindow(Duration);

impl InactivityWindow {
    /// Create a new InactivityWindow with validation.
    pub fn new(window: Duration) -> Result<Self, HardValidationError> {
        if window.is_zero() {
            return Err(HardValidationError::InvalidFieldValue {
                field: "inactivity_duration_secs",
                value: "0".to_string(),
                reason: "Inactivity window must be greater than 0".to_string(),
            });
        }
        Ok(Self(window))
    }

    /// Create from seconds for convenience.
    pub fn from_secs(secs: u64) -> Result<Self, HardValidationError> {
        Self::new(Duration::from_secs(secs))
    }

    /// Get the window as a Duration.
    pub fn duration(&self) -> Duration {
        self.0
    }
}

impl fmt::Display for InactivityWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s", self.0.as_secs_f64())
    }
}

impl From<InactivityWindow> for Duration {
    fn from(window: InactivityWindow) -> Self {
        window.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_function_name_valid() {
        assert!(FunctionName::new("figlet").is_ok());
        assert!(FunctionName::new("nodeinfo-2").is_ok());
        assert!(FunctionName::new("fn_1.openfaas-fn").is_ok());
    }

    #[test]
    fn test_function_name_invalid() {
        assert!(FunctionName::new("").is_err());
        assert!(FunctionName::new("a".repeat(64)).is_err());
        assert!(FunctionName::new("../system/info").is_err());
        assert!(FunctionName::new("func name").is_err());
        assert!(FunctionName::new("función").is_err());
    }

    #[test]
    fn test_function_name_serde() {
        let name: FunctionName = serde_yaml::from_str("figlet").unwrap();
        assert_eq!(name.as_str(), "figlet");
        assert!(serde_yaml::from_str::<FunctionName>("\"a/b\"").is_err());
    }

    #[test]
    fn test_inactivity_window() {
        assert!(InactivityWindow::from_secs(0).is_err());
        let window = InactivityWindow::from_secs(300).unwrap();
        assert_eq!(window.duration(), Duration::from_secs(300));
        assert_eq!(window.to_string(), "300s");
    }
}
