//! Request and response bodies

use ledger_bridge::PaymentIntent;
use ledger_core::{DocPath, Document, Timestamp};
use ledger_store::StoredDocument;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePaymentIntentRequest {
    /// Minor currency units
    pub amount: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentIntentResponse {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
}

impl From<PaymentIntent> for CreatePaymentIntentResponse {
    fn from(intent: PaymentIntent) -> Self {
        Self {
            id: intent.id,
            amount: intent.amount,
            currency: intent.currency,
            status: intent.status,
            client_secret: intent.client_secret,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmPaymentRequest {
    pub payment_intent_id: String,
}

/// Stored document as returned to the client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentResponse {
    pub path: String,
    pub data: Document,
    pub version: u64,
    pub create_time: Timestamp,
    pub update_time: Timestamp,
}

impl From<StoredDocument> for DocumentResponse {
    fn from(stored: StoredDocument) -> Self {
        Self {
            path: stored.path.to_string(),
            data: stored.data,
            version: stored.version,
            create_time: stored.create_time,
            update_time: stored.update_time,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteDocumentResponse {
    pub path: String,
    pub version: u64,
    pub commit_time: Timestamp,
}

impl WriteDocumentResponse {
    pub fn new(path: &DocPath, version: u64, commit_time: Timestamp) -> Self {
        Self {
            path: path.to_string(),
            version,
            commit_time,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub environment: String,
    pub payment_provider: String,
    pub uptime_secs: u64,
    pub total_requests: u64,
}
