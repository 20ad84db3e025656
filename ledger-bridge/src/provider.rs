//! Payment Provider Client
//!
//! The ledger only needs two provider calls: create a payment-intent and
//! look one up by id. Implementations:
//! - [`crate::StripePaymentProvider`]: the provider's REST API
//! - [`crate::MockPaymentProvider`]: in-memory, for development and tests

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::BridgeResult;

/// Status string of a payment-intent that has been paid
pub const STATUS_SUCCEEDED: &str = "succeeded";

/// Provider view of a payment-intent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    /// Minor currency units
    pub amount: i64,
    /// Lowercase ISO code
    pub currency: String,
    pub status: String,
    #[serde(default)]
    pub client_secret: Option<String>,
}

impl PaymentIntent {
    pub fn is_succeeded(&self) -> bool {
        self.status == STATUS_SUCCEEDED
    }
}

/// Payment provider trait
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Create a payment-intent for `amount` minor units of `currency`
    async fn create_payment_intent(&self, amount: i64, currency: &str)
        -> BridgeResult<PaymentIntent>;

    /// Look up a payment-intent; `Ok(None)` when the provider does not know the id
    async fn retrieve_payment_intent(&self, id: &str) -> BridgeResult<Option<PaymentIntent>>;

    /// Short name for logs
    fn name(&self) -> &'static str;
}
