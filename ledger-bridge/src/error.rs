//! Bridge Error Types
//!
//! Errors raised while talking to the payment provider.

use thiserror::Error;

/// Bridge Result type
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Bridge errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BridgeError {
    /// Provider could not be reached
    #[error("Payment provider unavailable: {0}")]
    Unavailable(String),

    /// Provider rejected the request
    #[error("Payment provider rejected request with status {status}: {message}")]
    Rejected { status: u16, message: String },

    /// Response body could not be decoded
    #[error("Invalid provider response: {0}")]
    InvalidResponse(String),

    /// Request parameters are invalid before sending
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Provider is not configured
    #[error("Payment provider not configured: {0}")]
    NotConfigured(String),

    /// Retry limit exceeded
    #[error("Retry limit exceeded after {attempts} attempts: {reason}")]
    RetryLimitExceeded { attempts: u32, reason: String },
}

impl BridgeError {
    /// Whether the call may succeed when retried
    pub fn is_transient(&self) -> bool {
        match self {
            BridgeError::Unavailable(_) => true,
            BridgeError::Rejected { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}
