//! Error types for query translation.

use thiserror::Error;

/// Query validation/translation errors.
///
/// These are raised before any backend I/O happens, so callers can always
/// distinguish "no match" from "bad query".
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// Operator outside the configured allow-list.
    #[error("unsupported operator {0}")]
    UnsupportedOperator(String),

    /// Right operand shape does not fit the operator.
    #[error("right operand for '{operator}' must be {expected}")]
    InvalidOperand { operator: String, expected: String },

    /// Field has no declared document path (strict backends only).
    #[error("no document path mapped for property '{0}'")]
    UnmappedProperty(String),

    /// Mapping table rejected at construction time.
    #[error("invalid field mapping: {0}")]
    InvalidMapping(String),
}

impl QueryError {
    /// Create an unsupported-operator error.
    pub fn unsupported_operator(operator: impl Into<String>) -> Self {
        Self::UnsupportedOperator(operator.into())
    }

    /// Create an invalid-operand error.
    pub fn invalid_operand(operator: impl Into<String>, expected: impl Into<String>) -> Self {
        Self::InvalidOperand {
            operator: operator.into(),
            expected: expected.into(),
        }
    }
}
