//! Ledger Store Error Types

use ledger_core::{DocPath, LedgerError};
use thiserror::Error;

/// Ledger Store Result type
pub type StoreResult<T> = Result<T, StoreError>;

/// Ledger Store Error
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Rule evaluation denied the access; never says which predicate failed
    #[error("Permission denied")]
    PermissionDenied,

    /// A write precondition did not hold
    #[error("Conflict on {path}: expected {expected}, found {actual}")]
    Conflict {
        path: String,
        expected: String,
        actual: String,
    },

    /// Document or blob not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Stored document does not match its schema
    #[error("Schema error: {0}")]
    Schema(#[from] LedgerError),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl StoreError {
    /// Create a conflict error
    pub fn conflict(
        path: &DocPath,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::Conflict {
            path: path.to_string(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(what: impl std::fmt::Display) -> Self {
        Self::NotFound(what.to_string())
    }

    /// Whether retrying against fresh state can succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }

    pub fn is_permission_denied(&self) -> bool {
        matches!(self, StoreError::PermissionDenied)
    }
}
