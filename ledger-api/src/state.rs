//! Application State
//!
//! Shared state for the ledger API service.

use chrono::{DateTime, Utc};
use ledger_bridge::{MockPaymentProvider, PaymentProvider, StripePaymentProvider};
use ledger_store::{BlobStore, DocumentStore, LedgerDocs, MemoryBlobStore, MemoryDocumentStore};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::auth::JwtConfig;
use crate::config::LedgerConfig;
use crate::error::ApiResult;
use crate::orchestrator::{BalanceOrchestrator, OrchestratorConfig};

/// Application state shared across handlers
pub struct AppState {
    pub config: LedgerConfig,
    pub jwt: JwtConfig,
    /// Client document channel
    pub store: Arc<dyn DocumentStore>,
    pub docs: LedgerDocs,
    pub blobs: Arc<dyn BlobStore>,
    pub orchestrator: BalanceOrchestrator,
    /// Service start time
    pub started_at: DateTime<Utc>,
    request_counter: RwLock<u64>,
}

impl AppState {
    /// Wire the service over the given collaborators
    pub fn new(
        config: LedgerConfig,
        store: Arc<dyn DocumentStore>,
        blobs: Arc<dyn BlobStore>,
        provider: Arc<dyn PaymentProvider>,
    ) -> Self {
        let docs = LedgerDocs::new(store.clone());
        let orchestrator = BalanceOrchestrator::new(
            docs.clone(),
            blobs.clone(),
            provider,
            OrchestratorConfig::from(&config),
        );
        Self {
            jwt: JwtConfig::new(config.jwt_secret.clone()),
            config,
            store,
            docs,
            blobs,
            orchestrator,
            started_at: Utc::now(),
            request_counter: RwLock::new(0),
        }
    }

    /// In-memory store and blob store; the REST provider when a key is
    /// configured, the mock provider otherwise
    pub fn from_config(config: LedgerConfig) -> ApiResult<Self> {
        config.validate()?;

        let store: Arc<dyn DocumentStore> = Arc::new(MemoryDocumentStore::new());
        let blobs: Arc<dyn BlobStore> = Arc::new(MemoryBlobStore::new(store.clone()));
        let provider: Arc<dyn PaymentProvider> = match &config.stripe_secret_key {
            Some(key) => Arc::new(StripePaymentProvider::with_base_url(
                &config.stripe_api_base,
                key.clone(),
            )),
            None => {
                tracing::warn!(environment = %config.environment, "no provider key configured, using the mock payment provider");
                Arc::new(MockPaymentProvider::new())
            }
        };

        Ok(Self::new(config, store, blobs, provider))
    }

    /// Replace the token configuration
    pub fn with_jwt(mut self, jwt: JwtConfig) -> Self {
        self.jwt = jwt;
        self
    }

    /// Increment and return the request counter
    pub async fn increment_requests(&self) -> u64 {
        let mut counter = self.request_counter.write().await;
        *counter += 1;
        *counter
    }

    pub async fn request_count(&self) -> u64 {
        *self.request_counter.read().await
    }

    /// Get uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        (Utc::now() - self.started_at).num_seconds().max(0) as u64
    }
}
