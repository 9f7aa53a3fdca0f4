//! # Error Types
//!
//! Domain-specific error types for splitwiser-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  splitwiser-core errors (this file)                                    │
//! │  ├── ValidationError  - one problem found in the input document        │
//! │  └── CoreError        - what `parse` returns to callers                │
//! │                                                                         │
//! │  splitwiser CLI errors (separate crate)                                │
//! │  └── CliError         - usage / IO / config failures                   │
//! │                                                                         │
//! │  Flow: ValidationError → ValidationWarning → CoreError → CliError      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Malformed lines are never errors: the parser skips them. Only reference
//! and naming problems, which would silently change who owes what, are
//! reported.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;

// =============================================================================
// Validation Error
// =============================================================================

/// A single problem found while validating an input document.
///
/// The `Display` text is the user-facing message.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize, TS)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[ts(export)]
pub enum ValidationError {
    /// Two person headers collapse to the same base name (case-insensitive).
    #[error("Name \"{name}\" is duplicated with \"{existing}\"")]
    DuplicateName { name: String, existing: String },

    /// A participant reference matches more than one declared person.
    #[error("\"{reference}\" is ambiguous - could refer to: {}", .candidates.join(", "))]
    AmbiguousReference {
        reference: String,
        candidates: Vec<String>,
    },

    /// A participant reference matches nobody.
    #[error("\"{reference}\" does not match any listed person")]
    PersonNotFound { reference: String },
}

/// A validation problem together with the line that caused it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ValidationWarning {
    /// The offending source line, trimmed.
    pub line: String,

    /// What is wrong with it.
    pub error: ValidationError,
}

impl ValidationWarning {
    pub fn new(line: impl Into<String>, error: ValidationError) -> Self {
        ValidationWarning {
            line: line.into(),
            error,
        }
    }

    /// User-facing message for this warning.
    pub fn message(&self) -> String {
        self.error.to_string()
    }
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.line, self.error)
    }
}

// =============================================================================
// Core Error
// =============================================================================

/// Errors returned by the public core API.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The document has validation warnings; nothing was allocated.
    ///
    /// The message lists every warning, one per line:
    /// ```text
    /// Validation failed:
    /// 50 Dinner - J: "J" is ambiguous - could refer to: John Smith, Jane Smith
    /// ```
    #[error("Validation failed:\n{}", render_warnings(.warnings))]
    ValidationFailed { warnings: Vec<ValidationWarning> },

    /// A settlement was requested for someone who is not in the ledger.
    #[error("Participant not found: {0}")]
    ParticipantNotFound(String),

    /// A settlement amount must be positive.
    #[error("Invalid settlement amount: {reason}")]
    InvalidAmount { reason: String },

    /// The recorded line did not parse back as the requested payment.
    #[error("Cannot record {amount} from {from} to {to} in the document")]
    UnrecordableTransfer {
        from: String,
        to: String,
        amount: String,
    },

    /// Sums of amounts or fees exceed the representable range.
    #[error("Amount overflow in {context}")]
    AmountOverflow { context: String },

    /// Configuration values are inconsistent.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

fn render_warnings(warnings: &[ValidationWarning]) -> String {
    warnings
        .iter()
        .map(ValidationWarning::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::DuplicateName {
            name: "john".to_string(),
            existing: "John".to_string(),
        };
        assert_eq!(err.to_string(), "Name \"john\" is duplicated with \"John\"");

        let err = ValidationError::AmbiguousReference {
            reference: "J".to_string(),
            candidates: vec!["John Smith".to_string(), "Jane Smith".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "\"J\" is ambiguous - could refer to: John Smith, Jane Smith"
        );

        let err = ValidationError::PersonNotFound {
            reference: "Bob".to_string(),
        };
        assert_eq!(err.to_string(), "\"Bob\" does not match any listed person");
    }

    #[test]
    fn test_validation_failed_lists_every_warning() {
        let err = CoreError::ValidationFailed {
            warnings: vec![
                ValidationWarning::new(
                    "john",
                    ValidationError::DuplicateName {
                        name: "john".to_string(),
                        existing: "John".to_string(),
                    },
                ),
                ValidationWarning::new(
                    "25 > Charlie",
                    ValidationError::PersonNotFound {
                        reference: "Charlie".to_string(),
                    },
                ),
            ],
        };

        let message = err.to_string();
        assert!(message.starts_with("Validation failed:\n"));
        assert_eq!(message.lines().count(), 3);
        assert!(message.contains("25 > Charlie: \"Charlie\" does not match"));
    }
}
