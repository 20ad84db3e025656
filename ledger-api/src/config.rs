//! Service Configuration
//!
//! Assembled from environment variables:
//! - `LEDGER_ENV`: development | test | production (default: development)
//! - `LEDGER_LISTEN_ADDR`: listen address (default: 0.0.0.0:3000)
//! - `LEDGER_CURRENCY`: payment currency (default: gbp)
//! - `LEDGER_JWT_SECRET`: HS256 secret for bearer tokens
//! - `LEDGER_REQUIRE_SUCCEEDED`: only credit succeeded payment-intents
//! - `LEDGER_MAX_COMMIT_ATTEMPTS`: confirm retries on write conflicts
//! - `STRIPE_SECRET_KEY`: payment provider secret key
//! - `STRIPE_API_BASE`: payment provider base url

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Secret used outside production when none is configured
pub const DEVELOPMENT_JWT_SECRET: &str = "ledger-development-secret-change-me-0000";

/// Minimum HS256 secret length accepted in production
pub const MIN_JWT_SECRET_LENGTH: usize = 32;

/// Deployment environment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Environment {
    #[default]
    Development,
    Test,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Test => "test",
            Environment::Production => "production",
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "test" => Ok(Environment::Test),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(ConfigError::Invalid {
                key: "LEDGER_ENV",
                value: other.to_string(),
            }),
        }
    }
}

/// Configuration errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}")]
    Invalid { key: &'static str, value: String },

    #[error("{0} must be set in production")]
    Missing(&'static str),

    #[error("LEDGER_JWT_SECRET must be at least {MIN_JWT_SECRET_LENGTH} bytes")]
    WeakJwtSecret,
}

/// Ledger service configuration
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    pub environment: Environment,
    pub service_name: String,
    pub version: String,
    pub listen_addr: String,
    /// Lowercase ISO currency every confirmed payment must use
    pub currency: String,
    pub jwt_secret: String,
    pub require_succeeded: bool,
    pub max_commit_attempts: u32,
    /// No key means the in-memory mock provider
    pub stripe_secret_key: Option<String>,
    pub stripe_api_base: String,
    pub enable_cors: bool,
    /// Max request body size (bytes), uploads included
    pub max_body_size: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            environment: Environment::Development,
            service_name: "ledger-api".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            listen_addr: "0.0.0.0:3000".to_string(),
            currency: "gbp".to_string(),
            jwt_secret: DEVELOPMENT_JWT_SECRET.to_string(),
            require_succeeded: false,
            max_commit_attempts: 3,
            stripe_secret_key: None,
            stripe_api_base: ledger_bridge::DEFAULT_API_BASE.to_string(),
            enable_cors: true,
            max_body_size: 10 * 1024 * 1024, // 10MB
        }
    }
}

impl LedgerConfig {
    /// Create from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let environment = match lookup("LEDGER_ENV") {
            Some(v) => v.parse()?,
            None => Environment::Development,
        };

        let require_succeeded = match lookup("LEDGER_REQUIRE_SUCCEEDED") {
            Some(v) => parse_bool("LEDGER_REQUIRE_SUCCEEDED", &v)?,
            None => defaults.require_succeeded,
        };

        let max_commit_attempts = match lookup("LEDGER_MAX_COMMIT_ATTEMPTS") {
            Some(v) => v
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or(ConfigError::Invalid {
                    key: "LEDGER_MAX_COMMIT_ATTEMPTS",
                    value: v,
                })?,
            None => defaults.max_commit_attempts,
        };

        let jwt_secret = match (lookup("LEDGER_JWT_SECRET"), environment) {
            (Some(secret), _) => secret,
            (None, Environment::Production) => return Err(ConfigError::Missing("LEDGER_JWT_SECRET")),
            (None, _) => defaults.jwt_secret.clone(),
        };

        let config = Self {
            environment,
            listen_addr: lookup("LEDGER_LISTEN_ADDR").unwrap_or(defaults.listen_addr.clone()),
            currency: lookup("LEDGER_CURRENCY")
                .map(|c| c.trim().to_lowercase())
                .unwrap_or(defaults.currency.clone()),
            jwt_secret,
            require_succeeded,
            max_commit_attempts,
            stripe_secret_key: lookup("STRIPE_SECRET_KEY").filter(|k| !k.is_empty()),
            stripe_api_base: lookup("STRIPE_API_BASE").unwrap_or(defaults.stripe_api_base.clone()),
            ..defaults
        };
        config.validate()?;
        Ok(config)
    }

    /// Check the combination of settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.currency.is_empty() {
            return Err(ConfigError::Invalid {
                key: "LEDGER_CURRENCY",
                value: self.currency.clone(),
            });
        }
        if self.environment.is_production() {
            if self.stripe_secret_key.is_none() {
                return Err(ConfigError::Missing("STRIPE_SECRET_KEY"));
            }
            if self.jwt_secret.len() < MIN_JWT_SECRET_LENGTH {
                return Err(ConfigError::WeakJwtSecret);
            }
        }
        Ok(())
    }

    pub fn uses_mock_provider(&self) -> bool {
        self.stripe_secret_key.is_none()
    }
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::Invalid {
            key,
            value: value.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<LedgerConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        LedgerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.currency, "gbp");
        assert!(config.uses_mock_provider());
        assert!(!config.require_succeeded);
        assert_eq!(config.max_commit_attempts, 3);
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("LEDGER_ENV", "test"),
            ("LEDGER_CURRENCY", "USD"),
            ("LEDGER_REQUIRE_SUCCEEDED", "true"),
            ("LEDGER_MAX_COMMIT_ATTEMPTS", "5"),
            ("STRIPE_SECRET_KEY", "sk_test_123"),
        ])
        .unwrap();
        assert_eq!(config.environment, Environment::Test);
        assert_eq!(config.currency, "usd");
        assert!(config.require_succeeded);
        assert_eq!(config.max_commit_attempts, 5);
        assert!(!config.uses_mock_provider());
    }

    #[test]
    fn test_production_requires_secrets() {
        assert_eq!(
            config_from(&[("LEDGER_ENV", "production")]).unwrap_err(),
            ConfigError::Missing("LEDGER_JWT_SECRET")
        );
        assert_eq!(
            config_from(&[
                ("LEDGER_ENV", "production"),
                ("LEDGER_JWT_SECRET", "0123456789abcdef0123456789abcdef"),
            ])
            .unwrap_err(),
            ConfigError::Missing("STRIPE_SECRET_KEY")
        );
        assert_eq!(
            config_from(&[
                ("LEDGER_ENV", "production"),
                ("LEDGER_JWT_SECRET", "short"),
                ("STRIPE_SECRET_KEY", "sk_live_1"),
            ])
            .unwrap_err(),
            ConfigError::WeakJwtSecret
        );
    }

    #[test]
    fn test_invalid_values() {
        assert!(config_from(&[("LEDGER_ENV", "staging")]).is_err());
        assert!(config_from(&[("LEDGER_REQUIRE_SUCCEEDED", "maybe")]).is_err());
        assert!(config_from(&[("LEDGER_MAX_COMMIT_ATTEMPTS", "0")]).is_err());
    }
}
