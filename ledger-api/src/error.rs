//! API Error Types

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use ledger_store::StoreError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ConfigError;
use crate::orchestrator::ConfirmError;

/// API-specific errors
#[derive(Error, Debug)]
pub enum ApiError {
    /// Validation error
    #[error("Validation error: {message}")]
    ValidationError { message: String },

    /// Resource not found
    #[error("Resource not found: {resource_type} {id}")]
    NotFound { resource_type: String, id: String },

    /// Missing or invalid credentials
    #[error("Unauthorized: {reason}")]
    Unauthorized { reason: String },

    /// Rule denial; never carries detail
    #[error("Permission denied")]
    PermissionDenied,

    /// Precondition failed or concurrent modification
    #[error("Conflict: {message}")]
    Conflict { message: String },

    /// Payment provider failure
    #[error("Payment provider error: {message}")]
    Provider { message: String },

    /// Internal error
    #[error("Internal error: {message}")]
    Internal { message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// API result type
pub type ApiResult<T> = Result<T, ApiError>;

/// Error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl ApiError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::ValidationError { .. } => StatusCode::BAD_REQUEST,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            ApiError::PermissionDenied => StatusCode::FORBIDDEN,
            ApiError::Conflict { .. } => StatusCode::CONFLICT,
            ApiError::Provider { .. } => StatusCode::BAD_GATEWAY,
            ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get error code string
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::ValidationError { .. } => "VALIDATION_ERROR",
            ApiError::NotFound { .. } => "NOT_FOUND",
            ApiError::Unauthorized { .. } => "UNAUTHORIZED",
            ApiError::PermissionDenied => "PERMISSION_DENIED",
            ApiError::Conflict { .. } => "CONFLICT",
            ApiError::Provider { .. } => "PROVIDER_ERROR",
            ApiError::Internal { .. } => "INTERNAL_ERROR",
            ApiError::Config(_) => "CONFIG_ERROR",
        }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::ValidationError {
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(resource_type: impl Into<String>, id: impl Into<String>) -> Self {
        ApiError::NotFound {
            resource_type: resource_type.into(),
            id: id.into(),
        }
    }

    /// Create an unauthorized error
    pub fn unauthorized(reason: impl Into<String>) -> Self {
        ApiError::Unauthorized {
            reason: reason.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::Internal {
            message: message.into(),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::PermissionDenied => ApiError::PermissionDenied,
            StoreError::Conflict { .. } => ApiError::Conflict {
                message: err.to_string(),
            },
            StoreError::NotFound(what) => ApiError::not_found("object", what),
            StoreError::Schema(e) => ApiError::internal(e.to_string()),
            StoreError::Internal(message) => ApiError::Internal { message },
        }
    }
}

impl From<ConfirmError> for ApiError {
    fn from(err: ConfirmError) -> Self {
        match err {
            ConfirmError::Validation(message) | ConfirmError::InvalidPayment(message) => {
                ApiError::ValidationError { message }
            }
            ConfirmError::Unauthenticated => ApiError::unauthorized(err.to_string()),
            ConfirmError::AuthorizationDenied => ApiError::PermissionDenied,
            ConfirmError::PaymentNotFound(id) => ApiError::not_found("payment intent", id),
            ConfirmError::RecordNotFound(id) => ApiError::not_found("paymentIntentDoc", id),
            ConfirmError::BalanceNotFound => ApiError::not_found("balanceDoc", "caller"),
            ConfirmError::OwnershipMismatch | ConfirmError::AlreadyApplied => ApiError::Conflict {
                message: err.to_string(),
            },
            ConfirmError::Provider(e) => ApiError::Provider {
                message: e.to_string(),
            },
            ConfirmError::Store(e) => e.into(),
            ConfirmError::PartialFailure { .. } => ApiError::internal(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = ErrorResponse {
            code: self.error_code().to_string(),
            message: self.to_string(),
        };

        (status, Json(body)).into_response()
    }
}


