//! Error taxonomy shared across the pipeline
//!
//! Categorization is by error type and origin, never by inspecting raw
//! provider message strings.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Category a turn-level failure is classified into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Rejected before any provider call (empty, too long)
    InputValidation,
    /// Transport-level failure
    ConnectionIssue,
    /// A provider failed or timed out after retries
    ProviderFailure,
    /// Catch-all
    GeneralError,
}

impl ErrorCategory {
    pub const ALL: [ErrorCategory; 4] = [
        ErrorCategory::InputValidation,
        ErrorCategory::ConnectionIssue,
        ErrorCategory::ProviderFailure,
        ErrorCategory::GeneralError,
    ];

    /// Stable label used for metrics and wire error types
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::InputValidation => "input_validation",
            ErrorCategory::ConnectionIssue => "connection_issue",
            ErrorCategory::ProviderFailure => "provider_failure",
            ErrorCategory::GeneralError => "general_error",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Implemented by crate errors that map onto the taxonomy
pub trait Categorize {
    fn category(&self) -> ErrorCategory;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_labels() {
        assert_eq!(ErrorCategory::ProviderFailure.as_str(), "provider_failure");
        assert_eq!(
            serde_json::to_value(ErrorCategory::InputValidation).unwrap(),
            "input_validation"
        );
    }
}
