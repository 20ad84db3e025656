//! Ledger Error Codes Registry
//!
//! Error code format: LEDGER-{module}-{sequence}
//! - LEDGER-SCHEMA: Document shape and type errors
//! - LEDGER-TIME: Timestamp errors
//! - LEDGER-ID: Collection, path and identifier errors
//! - LEDGER-BALANCE: Balance transition errors

use thiserror::Error;

/// Ledger Result type
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Ledger Error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    // ============================================================
    // Schema Errors (LEDGER-SCHEMA-*)
    // ============================================================
    /// [LEDGER-SCHEMA-001] Required field missing
    #[error("[LEDGER-SCHEMA-001] Missing field {field} in {collection} document")]
    MissingField { collection: String, field: String },

    /// [LEDGER-SCHEMA-002] Field not declared by the schema
    #[error("[LEDGER-SCHEMA-002] Unexpected field {field} in {collection} document")]
    UnexpectedField { collection: String, field: String },

    /// [LEDGER-SCHEMA-003] Field has the wrong type
    #[error("[LEDGER-SCHEMA-003] Field {field} expected {expected}, got {actual}")]
    FieldType {
        field: String,
        expected: String,
        actual: String,
    },

    /// [LEDGER-SCHEMA-004] Number is not integer-valued
    #[error("[LEDGER-SCHEMA-004] Field {field} must be an integer-valued number")]
    NonIntegerNumber { field: String },

    // ============================================================
    // Time Errors (LEDGER-TIME-*)
    // ============================================================
    /// [LEDGER-TIME-001] Nanoseconds out of range
    #[error("[LEDGER-TIME-001] Timestamp nanoseconds {nanoseconds} out of range")]
    InvalidNanoseconds { nanoseconds: i64 },

    /// [LEDGER-TIME-002] Timestamp not representable
    #[error("[LEDGER-TIME-002] Timestamp {seconds}s is out of the representable range")]
    TimestampOutOfRange { seconds: i64 },

    // ============================================================
    // Identifier Errors (LEDGER-ID-*)
    // ============================================================
    /// [LEDGER-ID-001] Unknown collection
    #[error("[LEDGER-ID-001] Unknown collection {name}")]
    UnknownCollection { name: String },

    /// [LEDGER-ID-002] Invalid document path
    #[error("[LEDGER-ID-002] Invalid document path {path}")]
    InvalidPath { path: String },

    /// [LEDGER-ID-003] Empty identifier
    #[error("[LEDGER-ID-003] {kind} must not be empty")]
    EmptyId { kind: String },

    // ============================================================
    // Balance Errors (LEDGER-BALANCE-*)
    // ============================================================
    /// [LEDGER-BALANCE-001] Credit overflows the balance
    #[error("[LEDGER-BALANCE-001] Crediting {amount} overflows balance {value}")]
    BalanceOverflow { value: i64, amount: i64 },

    /// [LEDGER-BALANCE-002] Upload intent is not pending
    #[error("[LEDGER-BALANCE-002] Upload intent {id} is not pending")]
    UploadIntentNotPending { id: String },

    /// [LEDGER-BALANCE-003] Non-positive credit
    #[error("[LEDGER-BALANCE-003] Credit amount must be greater than 0, got {amount}")]
    NonPositiveCredit { amount: i64 },

    // ============================================================
    // General Errors
    // ============================================================
    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl LedgerError {
    /// Whether this error came from schema validation
    pub fn is_schema_error(&self) -> bool {
        matches!(
            self,
            LedgerError::MissingField { .. }
                | LedgerError::UnexpectedField { .. }
                | LedgerError::FieldType { .. }
                | LedgerError::NonIntegerNumber { .. }
        )
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        LedgerError::Serialization(err.to_string())
    }
}
