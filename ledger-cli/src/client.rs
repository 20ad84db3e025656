//! API Client
//!
//! HTTP client for communicating with the ledger API.

use crate::error::{CliError, CliResult};
use ledger_api::dto::{
    CreatePaymentIntentRequest, CreatePaymentIntentResponse, DocumentResponse, HealthResponse,
};
use ledger_api::{ConfirmOutcome, ErrorResponse, UploadReceipt};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;

/// Ledger API client
pub struct LedgerClient {
    client: Client,
    base_url: String,
    /// Bearer token attached to every request
    token: Option<String>,
}

impl LedgerClient {
    /// Create a new client with a 30s timeout
    pub fn new(base_url: impl Into<String>) -> CliResult<Self> {
        Self::with_timeout(base_url, 30)
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout_secs: u64) -> CliResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| CliError::connection(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
        })
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.is_empty());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Get health status
    pub async fn health(&self) -> CliResult<HealthResponse> {
        let response = self.send(self.client.get(self.url("/health"))).await?;
        parse(response).await
    }

    /// Create a payment-intent for the caller
    pub async fn create_payment_intent(&self, amount: i64) -> CliResult<CreatePaymentIntentResponse> {
        let request = self
            .client
            .post(self.url("/payment-intents"))
            .json(&CreatePaymentIntentRequest { amount });
        parse(self.send(request).await?).await
    }

    /// Confirm a payment-intent. Domain failures come back as
    /// `success: false`, not as an error.
    pub async fn confirm_payment(&self, payment_intent_id: &str) -> CliResult<ConfirmOutcome> {
        let request = self
            .client
            .post(self.url("/payments/confirm"))
            .json(&json!({ "paymentIntentId": payment_intent_id }));
        parse(self.send(request).await?).await
    }

    /// Upload the file of an upload intent
    pub async fn upload(&self, upload_intent_id: &str, data: Vec<u8>) -> CliResult<UploadReceipt> {
        let request = self
            .client
            .put(self.url(&format!("/uploads/{}", upload_intent_id)))
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(data);
        parse(self.send(request).await?).await
    }

    /// Read a document through the client channel
    pub async fn get_document(&self, collection: &str, key: &str) -> CliResult<DocumentResponse> {
        let request = self
            .client
            .get(self.url(&format!("/documents/{}/{}", collection, key)));
        parse(self.send(request).await?).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(&self, request: RequestBuilder) -> CliResult<Response> {
        let request = match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };
        tracing::debug!(base_url = %self.base_url, "sending request");
        request.send().await.map_err(|e| {
            if e.is_connect() {
                CliError::connection(format!("{}: {}", self.base_url, e))
            } else {
                CliError::HttpError(e)
            }
        })
    }
}

async fn parse<T: DeserializeOwned>(response: Response) -> CliResult<T> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }
    let body = response.text().await.unwrap_or_default();
    Err(CliError::api(status.as_u16(), error_message(&body)))
}

/// `message` of an `{code, message}` body, the raw body otherwise
fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorResponse>(body) {
        Ok(error) => format!("{} ({})", error.message, error.code),
        Err(_) => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_trims_base_url() {
        let client = LedgerClient::new("http://localhost:3000/").unwrap();
        assert_eq!(client.base_url(), "http://localhost:3000");
        assert_eq!(client.url("/health"), "http://localhost:3000/health");
    }

    #[test]
    fn test_empty_token_is_ignored() {
        let client = LedgerClient::new("http://localhost:3000")
            .unwrap()
            .with_token(Some(String::new()));
        assert!(client.token.is_none());
    }

    #[test]
    fn test_error_message() {
        let body = r#"{"code":"PERMISSION_DENIED","message":"Permission denied"}"#;
        assert_eq!(error_message(body), "Permission denied (PERMISSION_DENIED)");
        assert_eq!(error_message("bad gateway"), "bad gateway");
    }
}
