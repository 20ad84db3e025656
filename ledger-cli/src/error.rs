//! CLI Error Types

use thiserror::Error;

/// CLI-specific errors
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("API connection error: {message}")]
    ConnectionError { message: String },

    /// Non-success HTTP status from the API
    #[error("API request failed: {status} - {message}")]
    ApiError { status: u16, message: String },

    /// Confirmation answered with `success: false`
    #[error("Payment not credited: {message}")]
    NotCredited { message: String },

    #[error("File I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Server error: {message}")]
    ServerError { message: String },
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;

impl CliError {
    pub fn config(message: impl Into<String>) -> Self {
        CliError::ConfigError {
            message: message.into(),
        }
    }

    pub fn invalid_arg(message: impl Into<String>) -> Self {
        CliError::InvalidArgument {
            message: message.into(),
        }
    }

    pub fn connection(message: impl Into<String>) -> Self {
        CliError::ConnectionError {
            message: message.into(),
        }
    }

    pub fn api(status: u16, message: impl Into<String>) -> Self {
        CliError::ApiError {
            status,
            message: message.into(),
        }
    }

    pub fn not_credited(message: impl Into<String>) -> Self {
        CliError::NotCredited {
            message: message.into(),
        }
    }

    pub fn server(message: impl Into<String>) -> Self {
        CliError::ServerError {
            message: message.into(),
        }
    }

    /// Get exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::ConfigError { .. } => 1,
            CliError::InvalidArgument { .. } => 2,
            CliError::ConnectionError { .. } => 3,
            CliError::ApiError { .. } => 4,
            CliError::IoError(_) => 5,
            CliError::JsonError(_) => 6,
            CliError::HttpError(_) => 7,
            CliError::NotCredited { .. } => 10,
            CliError::ServerError { .. } => 30,
        }
    }
}

impl From<ledger_api::ConfigError> for CliError {
    fn from(err: ledger_api::ConfigError) -> Self {
        CliError::config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error() {
        let err = CliError::config("LEDGER_JWT_SECRET is not set");
        assert_eq!(err.exit_code(), 1);
        assert!(err.to_string().contains("LEDGER_JWT_SECRET"));
    }

    #[test]
    fn test_api_error() {
        let err = CliError::api(403, "Permission denied");
        assert_eq!(err.exit_code(), 4);
        assert!(err.to_string().contains("403"));
    }

    #[test]
    fn test_not_credited() {
        let err = CliError::not_credited("amount already debitted");
        assert_eq!(err.exit_code(), 10);
        assert_eq!(err.to_string(), "Payment not credited: amount already debitted");
    }

    #[test]
    fn test_from_config_error() {
        let err: CliError = ledger_api::ConfigError::WeakJwtSecret.into();
        assert_eq!(err.exit_code(), 1);
    }
}
