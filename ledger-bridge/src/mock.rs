//! In-memory payment provider

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

use crate::error::{BridgeError, BridgeResult};
use crate::provider::{PaymentIntent, PaymentProvider};

/// Initial status the provider gives new intents
pub const STATUS_REQUIRES_PAYMENT_METHOD: &str = "requires_payment_method";

/// Mock provider for development and tests
pub struct MockPaymentProvider {
    intents: RwLock<HashMap<String, PaymentIntent>>,
    initial_status: String,
    /// Simulate an unreachable provider
    unavailable: AtomicBool,
}

impl MockPaymentProvider {
    pub fn new() -> Self {
        Self::with_initial_status(STATUS_REQUIRES_PAYMENT_METHOD)
    }

    /// New intents start in `status`
    pub fn with_initial_status(status: &str) -> Self {
        Self {
            intents: RwLock::new(HashMap::new()),
            initial_status: status.to_string(),
            unavailable: AtomicBool::new(false),
        }
    }

    /// Enable or disable unavailable mode
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Force the status of a known intent; returns false when unknown
    pub async fn set_status(&self, id: &str, status: &str) -> bool {
        match self.intents.write().await.get_mut(id) {
            Some(intent) => {
                intent.status = status.to_string();
                true
            }
            None => false,
        }
    }

    /// Register an arbitrary intent
    pub async fn insert(&self, intent: PaymentIntent) {
        self.intents.write().await.insert(intent.id.clone(), intent);
    }

    pub async fn len(&self) -> usize {
        self.intents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.intents.read().await.is_empty()
    }

    fn check_available(&self) -> BridgeResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(BridgeError::Unavailable("Mock unavailable mode".to_string()))
        } else {
            Ok(())
        }
    }
}

impl Default for MockPaymentProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PaymentProvider for MockPaymentProvider {
    async fn create_payment_intent(
        &self,
        amount: i64,
        currency: &str,
    ) -> BridgeResult<PaymentIntent> {
        self.check_available()?;
        if amount <= 0 {
            return Err(BridgeError::InvalidRequest(format!(
                "amount must be greater than 0, got {}",
                amount
            )));
        }

        let id = format!("pi_{}", uuid::Uuid::new_v4().simple());
        let intent = PaymentIntent {
            client_secret: Some(format!("{}_secret_{}", id, uuid::Uuid::new_v4().simple())),
            id,
            amount,
            currency: currency.to_lowercase(),
            status: self.initial_status.clone(),
        };
        self.insert(intent.clone()).await;
        Ok(intent)
    }

    async fn retrieve_payment_intent(&self, id: &str) -> BridgeResult<Option<PaymentIntent>> {
        self.check_available()?;
        Ok(self.intents.read().await.get(id).cloned())
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}


