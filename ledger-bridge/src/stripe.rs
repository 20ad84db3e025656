//! HTTP payment provider client
//!
//! Speaks the provider's REST API: form-encoded request bodies, bearer
//! secret key, JSON responses.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use crate::error::{BridgeError, BridgeResult};
use crate::provider::{PaymentIntent, PaymentProvider};

pub const DEFAULT_API_BASE: &str = "https://api.stripe.com";

/// Retry configuration for idempotent requests
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum retries after the first attempt
    pub max_retries: u32,
    /// Initial backoff in milliseconds
    pub initial_backoff_ms: u64,
    /// Maximum backoff in milliseconds
    pub max_backoff_ms: u64,
    /// Backoff multiplier
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_backoff_ms: 100,
            max_backoff_ms: 2000,
            multiplier: 2.0,
        }
    }
}

/// Provider client over HTTP
pub struct StripePaymentProvider {
    base_url: String,
    secret_key: String,
    client: reqwest::Client,
    timeout: Duration,
    retry_config: RetryConfig,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    message: Option<String>,
}

impl StripePaymentProvider {
    pub fn new(secret_key: impl Into<String>) -> Self {
        Self::with_base_url(DEFAULT_API_BASE, secret_key)
    }

    pub fn with_base_url(base_url: &str, secret_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            secret_key: secret_key.into(),
            client: reqwest::Client::new(),
            timeout: Duration::from_secs(30),
            retry_config: RetryConfig::default(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry_config(mut self, retry_config: RetryConfig) -> Self {
        self.retry_config = retry_config;
        self
    }

    fn intents_url(&self) -> String {
        format!("{}/v1/payment_intents", self.base_url)
    }

    async fn decode(response: reqwest::Response) -> BridgeResult<PaymentIntent> {
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&text)
                .ok()
                .and_then(|body| body.error.message)
                .unwrap_or(text);
            return Err(BridgeError::Rejected {
                status: status.as_u16(),
                message,
            });
        }
        response
            .json()
            .await
            .map_err(|e| BridgeError::InvalidResponse(e.to_string()))
    }

    async fn retrieve_once(&self, id: &str) -> BridgeResult<Option<PaymentIntent>> {
        let response = self
            .client
            .get(format!("{}/{}", self.intents_url(), id))
            .bearer_auth(&self.secret_key)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| BridgeError::Unavailable(format!("HTTP request failed: {}", e)))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Self::decode(response).await.map(Some)
    }
}

#[async_trait]
impl PaymentProvider for StripePaymentProvider {
    async fn create_payment_intent(
        &self,
        amount: i64,
        currency: &str,
    ) -> BridgeResult<PaymentIntent> {
        if amount <= 0 {
            return Err(BridgeError::InvalidRequest(format!(
                "amount must be greater than 0, got {}",
                amount
            )));
        }

        let amount = amount.to_string();
        let params = [
            ("amount", amount.as_str()),
            ("currency", currency),
            ("automatic_payment_methods[enabled]", "true"),
        ];

        // not retried: a lost response could otherwise create two intents
        let response = self
            .client
            .post(self.intents_url())
            .bearer_auth(&self.secret_key)
            .header("Idempotency-Key", uuid::Uuid::new_v4().to_string())
            .form(&params)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| BridgeError::Unavailable(format!("HTTP request failed: {}", e)))?;

        let intent = Self::decode(response).await?;
        tracing::info!(payment_intent_id = %intent.id, amount = intent.amount, "payment intent created");
        Ok(intent)
    }

    async fn retrieve_payment_intent(&self, id: &str) -> BridgeResult<Option<PaymentIntent>> {
        if !is_intent_id(id) {
            return Err(BridgeError::InvalidRequest(format!(
                "invalid payment intent id {:?}",
                id
            )));
        }

        let mut backoff_ms = self.retry_config.initial_backoff_ms;
        let mut attempt = 0;
        loop {
            match self.retrieve_once(id).await {
                Err(e) if e.is_transient() && attempt < self.retry_config.max_retries => {
                    tracing::warn!(attempt, error = %e, "retrying payment intent lookup");
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                    backoff_ms = std::cmp::min(
                        (backoff_ms as f64 * self.retry_config.multiplier) as u64,
                        self.retry_config.max_backoff_ms,
                    );
                    attempt += 1;
                }
                Err(e) if e.is_transient() && attempt > 0 => {
                    return Err(BridgeError::RetryLimitExceeded {
                        attempts: attempt + 1,
                        reason: e.to_string(),
                    })
                }
                other => return other,
            }
        }
    }

    fn name(&self) -> &'static str {
        "stripe"
    }
}

/// Provider ids are `[A-Za-z0-9_]+`; anything else would change the request path
fn is_intent_id(id: &str) -> bool {
    !id.is_empty() && id.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
}


