//! Bearer Token Authentication
//!
//! Callers present `Authorization: Bearer <JWT>` signed with HS256. The
//! token subject is the uid the request is evaluated as. The service
//! principal is never derived from a token.

use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use ledger_core::{Principal, Uid};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Default token lifetime
pub const DEFAULT_TOKEN_TTL_SECS: u64 = 3600;

/// JWT configuration
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub algorithm: Algorithm,
    /// Issuer to validate
    pub issuer: Option<String>,
    pub validate_exp: bool,
}

impl JwtConfig {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            algorithm: Algorithm::HS256,
            issuer: None,
            validate_exp: true,
        }
    }

    /// Set issuer validation
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    /// Sign a token for `uid`
    pub fn issue_token(&self, uid: &Uid, ttl_secs: u64) -> ApiResult<String> {
        let iat = chrono::Utc::now().timestamp().max(0) as u64;
        let claims = AuthClaims {
            sub: uid.to_string(),
            iat,
            exp: iat + ttl_secs,
            iss: self.issuer.clone(),
        };
        encode(
            &Header::new(self.algorithm),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| ApiError::internal(format!("failed to sign token: {}", e)))
    }

    /// Validate a token and extract its claims
    pub fn validate_token(&self, token: &str) -> ApiResult<AuthClaims> {
        let mut validation = Validation::new(self.algorithm);
        validation.validate_exp = self.validate_exp;
        if let Some(ref iss) = self.issuer {
            validation.set_issuer(&[iss]);
        }

        let key = DecodingKey::from_secret(self.secret.as_bytes());
        let data = decode::<AuthClaims>(token, &key, &validation).map_err(|e| {
            if e.kind() == &jsonwebtoken::errors::ErrorKind::ExpiredSignature {
                ApiError::unauthorized("token has expired")
            } else {
                ApiError::unauthorized(format!("invalid token: {}", e))
            }
        })?;
        Ok(data.claims)
    }
}

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthClaims {
    /// Subject (uid)
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
}

impl AuthClaims {
    pub fn principal(&self) -> ApiResult<Principal> {
        Uid::new(self.sub.clone())
            .map(Principal::User)
            .map_err(|_| ApiError::unauthorized("token subject is empty"))
    }
}

/// Token from an `Authorization` header value
pub fn extract_token(header: &str) -> ApiResult<&str> {
    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| {
            ApiError::unauthorized("invalid authorization header, expected: Bearer <token>")
        })
}

/// Principal of a request that may be unauthenticated.
///
/// A missing header yields `None`; a present but invalid token is rejected.
#[derive(Debug, Clone)]
pub struct MaybeAuthUser(pub Option<Principal>);

impl MaybeAuthUser {
    pub fn principal(&self) -> Option<&Principal> {
        self.0.as_ref()
    }
}

/// Principal of an authenticated request
#[derive(Debug, Clone)]
pub struct AuthUser(pub Principal);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for MaybeAuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let Some(header) = parts.headers.get(AUTHORIZATION) else {
            return Ok(MaybeAuthUser(None));
        };
        let header = header
            .to_str()
            .map_err(|_| ApiError::unauthorized("authorization header is not valid text"))?;
        let claims = state.jwt.validate_token(extract_token(header)?)?;
        Ok(MaybeAuthUser(Some(claims.principal()?)))
    }
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        MaybeAuthUser::from_request_parts(parts, state)
            .await?
            .0
            .map(AuthUser)
            .ok_or_else(|| ApiError::unauthorized("authorization header is required"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> JwtConfig {
        JwtConfig::new("test-secret-test-secret-test-secret")
    }

    #[test]
    fn test_issue_and_validate() {
        let uid = Uid::new("uid124").unwrap();
        let token = config().issue_token(&uid, 60).unwrap();
        let claims = config().validate_token(&token).unwrap();
        assert_eq!(claims.sub, "uid124");
        assert_eq!(claims.principal().unwrap(), Principal::User(uid));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = config()
            .issue_token(&Uid::new("uid124").unwrap(), 60)
            .unwrap();
        let err = JwtConfig::new("another-secret-another-secret-0000")
            .validate_token(&token)
            .unwrap_err();
        assert_eq!(err.error_code(), "UNAUTHORIZED");
    }

    #[test]
    fn test_issuer_checked() {
        let signer = config().with_issuer("ledger");
        let token = signer.issue_token(&Uid::new("uid124").unwrap(), 60).unwrap();
        assert!(signer.validate_token(&token).is_ok());
        assert!(config().with_issuer("other").validate_token(&token).is_err());
    }

    #[test]
    fn test_extract_token() {
        assert_eq!(extract_token("Bearer abc").unwrap(), "abc");
        assert!(extract_token("Basic abc").is_err());
        assert!(extract_token("Bearer ").is_err());
    }
}
