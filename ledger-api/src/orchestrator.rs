//! Balance Mutation Orchestrator
//!
//! Server side of the payment flow. `confirm_payment` credits a user's
//! balance once per provider payment-intent:
//!
//! ```text
//! provider lookup ──► paymentIntentDoc ──► owner / currency / amount
//!        │                                        │
//!        ▼                                        ▼
//!   PaymentNotFound                     isAccountDebitted == false ?
//!                                                 │
//!                            ┌────────────────────┴─────────────┐
//!                            ▼                                  ▼
//!                 credit balanceDoc + mark applied        AlreadyApplied
//!                 (one preconditioned batch)
//! ```
//!
//! Duplicates of one payment-intent are serialized by a per-id lock, and
//! every write carries the version it was computed from, so a concurrent
//! writer outside this process turns into a conflict and a re-check
//! instead of a second credit.

use ledger_bridge::{BridgeError, PaymentIntent, PaymentProvider, STATUS_SUCCEEDED};
use ledger_core::{Collection, PaymentIntentId, Principal, Uid, UploadIntentId};
use ledger_store::{
    BalanceRepository, BlobRef, BlobStore, LedgerDocs, PaymentIntentRepository, StoreError,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use crate::config::LedgerConfig;
use crate::locks::KeyedLocks;

/// How credit and settlement reach the store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CommitStrategy {
    /// One batch holding both writes
    #[default]
    Atomic,
    /// Balance first, then the payment-intent doc; for stores without
    /// atomic batches
    Sequential,
}

/// Orchestrator settings
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub currency: String,
    pub require_succeeded: bool,
    pub max_commit_attempts: u32,
    pub strategy: CommitStrategy,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            currency: "gbp".to_string(),
            require_succeeded: false,
            max_commit_attempts: 3,
            strategy: CommitStrategy::Atomic,
        }
    }
}

impl From<&LedgerConfig> for OrchestratorConfig {
    fn from(config: &LedgerConfig) -> Self {
        Self {
            currency: config.currency.clone(),
            require_succeeded: config.require_succeeded,
            max_commit_attempts: config.max_commit_attempts,
            strategy: CommitStrategy::Atomic,
        }
    }
}

/// Result type of orchestrated operations
pub type ConfirmResult<T> = Result<T, ConfirmError>;

/// Failures of orchestrated operations.
///
/// Messages are shown to the client as-is.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfirmError {
    #[error("{0}")]
    Validation(String),

    #[error("user must be authenticated")]
    Unauthenticated,

    #[error("payment intent {0} not found")]
    PaymentNotFound(String),

    #[error("paymentIntentDoc {0} not found")]
    RecordNotFound(String),

    #[error("user id does not match the paymentIntentDoc")]
    OwnershipMismatch,

    #[error("{0}")]
    InvalidPayment(String),

    #[error("amount already debitted")]
    AlreadyApplied,

    #[error("Could not get balanceDoc")]
    BalanceNotFound,

    #[error("permission denied")]
    AuthorizationDenied,

    /// Balance credited, payment-intent doc still unapplied
    #[error("Could not set paymentIntentDoc isAccountDebitted:true")]
    PartialFailure {
        payment_intent_id: String,
        uid: String,
        amount: i64,
    },

    #[error("payment provider error: {0}")]
    Provider(#[from] BridgeError),

    #[error("store error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for ConfirmError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::PermissionDenied => ConfirmError::AuthorizationDenied,
            other => ConfirmError::Store(other),
        }
    }
}

impl ConfirmError {
    /// Metric label
    pub fn outcome(&self) -> &'static str {
        match self {
            ConfirmError::Validation(_) => "validation_error",
            ConfirmError::Unauthenticated => "unauthenticated",
            ConfirmError::PaymentNotFound(_) => "payment_not_found",
            ConfirmError::RecordNotFound(_) => "record_not_found",
            ConfirmError::OwnershipMismatch => "ownership_mismatch",
            ConfirmError::InvalidPayment(_) => "invalid_payment",
            ConfirmError::AlreadyApplied => "already_applied",
            ConfirmError::BalanceNotFound => "balance_not_found",
            ConfirmError::AuthorizationDenied => "authorization_denied",
            ConfirmError::PartialFailure { .. } => "partial_failure",
            ConfirmError::Provider(_) => "provider_error",
            ConfirmError::Store(_) => "store_error",
        }
    }

    fn is_retryable_conflict(&self) -> bool {
        matches!(self, ConfirmError::Store(e) if e.is_retryable())
    }
}

/// A credited payment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirmation {
    pub payment_intent_id: PaymentIntentId,
    pub uid: Uid,
    pub amount: i64,
    /// Balance value after the credit
    pub balance: i64,
    pub attempts: u32,
}

/// Blob stored and, when still pending, its upload intent settled
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadReceipt {
    pub key: String,
    pub size_bytes: u64,
    /// False when the upload intent had already been settled
    pub newly_settled: bool,
}

/// Wire shape of a confirmation result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmOutcome {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<OutcomeError>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeError {
    pub message: String,
}

impl ConfirmOutcome {
    pub fn succeeded() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failed(err: &ConfirmError) -> Self {
        Self {
            success: false,
            error: Some(OutcomeError {
                message: err.to_string(),
            }),
        }
    }
}

impl<T> From<&ConfirmResult<T>> for ConfirmOutcome {
    fn from(result: &ConfirmResult<T>) -> Self {
        match result {
            Ok(_) => Self::succeeded(),
            Err(e) => Self::failed(e),
        }
    }
}

/// Drives the server-side balance transitions
pub struct BalanceOrchestrator {
    docs: LedgerDocs,
    blobs: Arc<dyn BlobStore>,
    provider: Arc<dyn PaymentProvider>,
    config: OrchestratorConfig,
    locks: KeyedLocks,
}

impl BalanceOrchestrator {
    pub fn new(
        docs: LedgerDocs,
        blobs: Arc<dyn BlobStore>,
        provider: Arc<dyn PaymentProvider>,
        mut config: OrchestratorConfig,
    ) -> Self {
        if config.strategy == CommitStrategy::Atomic && !docs.store().supports_atomic_commit() {
            tracing::warn!("document store has no atomic batches, confirming sequentially");
            config.strategy = CommitStrategy::Sequential;
        }
        config.max_commit_attempts = config.max_commit_attempts.max(1);

        Self {
            docs,
            blobs,
            provider,
            config,
            locks: KeyedLocks::new(),
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    /// Create a provider payment-intent and record it for the caller
    pub async fn create_payment_intent(
        &self,
        auth: Option<&Principal>,
        amount: i64,
    ) -> ConfirmResult<PaymentIntent> {
        let (principal, uid) = caller(auth)?;
        if amount <= 0 {
            return Err(ConfirmError::Validation(
                "amount must be greater than 0".to_string(),
            ));
        }

        let intent = self
            .provider
            .create_payment_intent(amount, &self.config.currency)
            .await?;
        let id = PaymentIntentId::new(intent.id.clone())
            .map_err(|e| BridgeError::InvalidResponse(e.to_string()))?;

        self.docs.payment_intents.create(principal, &id, uid).await?;
        tracing::info!(
            uid = %uid,
            payment_intent_id = %id,
            amount,
            provider = self.provider.name(),
            "payment intent recorded"
        );
        Ok(intent)
    }

    /// Credit the caller's balance with a paid payment-intent, once
    pub async fn confirm_payment(
        &self,
        auth: Option<&Principal>,
        payment_intent_id: &str,
    ) -> ConfirmResult<Confirmation> {
        let (_, uid) = caller(auth)?;
        let id = PaymentIntentId::new(payment_intent_id.trim())
            .map_err(|_| ConfirmError::Validation("paymentIntentId is required".to_string()))?;

        let intent = self
            .provider
            .retrieve_payment_intent(id.as_str())
            .await?
            .ok_or_else(|| ConfirmError::PaymentNotFound(id.to_string()))?;

        let _guard = self.locks.lock(id.as_str()).await;

        let mut attempts = 0;
        loop {
            attempts += 1;
            match self.apply_credit(uid, &id, &intent).await {
                Err(e) if e.is_retryable_conflict() && attempts < self.config.max_commit_attempts => {
                    tracing::warn!(payment_intent_id = %id, attempts, error = %e, "confirm conflicted, re-checking");
                }
                Err(e) => {
                    tracing::debug!(payment_intent_id = %id, uid = %uid, error = %e, "payment not confirmed");
                    return Err(e);
                }
                Ok(balance) => {
                    tracing::info!(
                        payment_intent_id = %id,
                        uid = %uid,
                        amount = intent.amount,
                        balance,
                        "payment confirmed"
                    );
                    return Ok(Confirmation {
                        payment_intent_id: id,
                        uid: uid.clone(),
                        amount: intent.amount,
                        balance,
                        attempts,
                    });
                }
            }
        }
    }

    /// One pass over the checks and writes; returns the new balance value
    async fn apply_credit(
        &self,
        uid: &Uid,
        id: &PaymentIntentId,
        intent: &PaymentIntent,
    ) -> ConfirmResult<i64> {
        let service = Principal::Service;

        let record = self
            .docs
            .payment_intents
            .get(&service, id)
            .await?
            .ok_or_else(|| ConfirmError::RecordNotFound(id.to_string()))?;
        if record.doc.uid != *uid {
            return Err(ConfirmError::OwnershipMismatch);
        }
        self.check_payment(intent)?;
        if record.doc.is_account_debitted {
            return Err(ConfirmError::AlreadyApplied);
        }

        let balance = self
            .docs
            .balances
            .get(&service, uid)
            .await?
            .ok_or(ConfirmError::BalanceNotFound)?;

        let credit = BalanceRepository::credit_write(&balance, intent.amount)?;
        let applied = PaymentIntentRepository::mark_debitted_write(&record);
        let store = self.docs.store();

        match self.config.strategy {
            CommitStrategy::Atomic => {
                store.commit(Some(&service), vec![credit, applied]).await?;
            }
            CommitStrategy::Sequential => {
                store.commit(Some(&service), vec![credit]).await?;
                if let Err(e) = store.commit(Some(&service), vec![applied]).await {
                    tracing::error!(
                        payment_intent_id = %id,
                        uid = %uid,
                        amount = intent.amount,
                        error = %e,
                        "balance credited but payment intent not marked applied, reconciliation required"
                    );
                    return Err(ConfirmError::PartialFailure {
                        payment_intent_id: id.to_string(),
                        uid: uid.to_string(),
                        amount: intent.amount,
                    });
                }
            }
        }

        Ok(balance.doc.value + intent.amount)
    }

    fn check_payment(&self, intent: &PaymentIntent) -> ConfirmResult<()> {
        if !intent.currency.eq_ignore_ascii_case(&self.config.currency) {
            return Err(ConfirmError::InvalidPayment(format!(
                "currency must be '{}'",
                self.config.currency
            )));
        }
        if intent.amount <= 0 {
            return Err(ConfirmError::InvalidPayment(
                "amount must be greater than 0".to_string(),
            ));
        }
        if self.config.require_succeeded && !intent.is_succeeded() {
            return Err(ConfirmError::InvalidPayment(format!(
                "payment status must be '{}', got '{}'",
                STATUS_SUCCEEDED, intent.status
            )));
        }
        Ok(())
    }

    /// Store the blob of an upload intent as the caller, then settle the
    /// intent in the caller's balance
    pub async fn complete_upload(
        &self,
        auth: Option<&Principal>,
        upload_intent_id: &str,
        data: &[u8],
    ) -> ConfirmResult<UploadReceipt> {
        let (principal, uid) = caller(auth)?;
        let id = UploadIntentId::new(upload_intent_id.trim())
            .map_err(|_| ConfirmError::Validation("uploadIntentId is required".to_string()))?;

        let meta = self
            .blobs
            .upload_bytes(Some(principal), &BlobRef::upload_file(&id), data)
            .await?;

        let _guard = self
            .locks
            .lock(&format!("{}/{}", Collection::BalanceDocs, uid))
            .await;

        let mut attempts = 0;
        let newly_settled = loop {
            attempts += 1;
            match self.settle(uid, &id).await {
                Err(e) if e.is_retryable_conflict() && attempts < self.config.max_commit_attempts => {
                    tracing::warn!(upload_intent_id = %id, attempts, error = %e, "settle conflicted, re-reading");
                }
                other => break other?,
            }
        };

        tracing::info!(uid = %uid, upload_intent_id = %id, size = meta.size_bytes, newly_settled, "upload completed");
        Ok(UploadReceipt {
            key: meta.key,
            size_bytes: meta.size_bytes,
            newly_settled,
        })
    }

    async fn settle(&self, uid: &Uid, id: &UploadIntentId) -> ConfirmResult<bool> {
        let service = Principal::Service;
        let balance = self
            .docs
            .balances
            .get(&service, uid)
            .await?
            .ok_or(ConfirmError::BalanceNotFound)?;

        if balance.doc.upload_intent_ids.get(id.as_str()) == Some(&true) {
            return Ok(false);
        }

        let write = BalanceRepository::settle_write(&balance, id)?;
        self.docs.store().commit(Some(&service), vec![write]).await?;
        Ok(true)
    }
}

/// The authenticated end user behind `auth`
fn caller(auth: Option<&Principal>) -> ConfirmResult<(&Principal, &Uid)> {
    let principal = auth.ok_or(ConfirmError::Unauthenticated)?;
    let uid = principal.uid().ok_or(ConfirmError::Unauthenticated)?;
    Ok((principal, uid))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use ledger_bridge::MockPaymentProvider;
    use ledger_core::DocPath;
    use ledger_store::{
        CommitResult, DocumentStore, DocumentWrite, MemoryBlobStore, MemoryDocumentStore,
        StoreResult, StoredDocument,
    };
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

    /// Memory store with injectable write failures
    struct FlakyStore {
        inner: MemoryDocumentStore,
        atomic: bool,
        fail_payment_intent_writes: AtomicBool,
        conflicts_left: AtomicU32,
    }

    impl FlakyStore {
        fn new(atomic: bool) -> Self {
            Self {
                inner: MemoryDocumentStore::new(),
                atomic,
                fail_payment_intent_writes: AtomicBool::new(false),
                conflicts_left: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl DocumentStore for FlakyStore {
        async fn get(
            &self,
            auth: Option<&Principal>,
            path: &DocPath,
        ) -> StoreResult<Option<StoredDocument>> {
            self.inner.get(auth, path).await
        }

        async fn commit(
            &self,
            auth: Option<&Principal>,
            writes: Vec<DocumentWrite>,
        ) -> StoreResult<CommitResult> {
            let touches_pi = writes
                .iter()
                .any(|w| w.path.collection == Collection::PaymentIntentDocs);
            let is_service = matches!(auth, Some(Principal::Service));
            if is_service && touches_pi && self.fail_payment_intent_writes.load(Ordering::SeqCst) {
                return Err(StoreError::Internal("injected failure".to_string()));
            }
            if is_service
                && self
                    .conflicts_left
                    .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                    .is_ok()
            {
                return Err(StoreError::conflict(&writes[0].path, "version 1", "version 2"));
            }
            self.inner.commit(auth, writes).await
        }

        fn supports_atomic_commit(&self) -> bool {
            self.atomic
        }
    }

    struct Fixture {
        store: Arc<FlakyStore>,
        docs: LedgerDocs,
        provider: Arc<MockPaymentProvider>,
        orchestrator: BalanceOrchestrator,
        alice: Principal,
    }

    async fn fixture_with(config: OrchestratorConfig, atomic: bool) -> Fixture {
        let store = Arc::new(FlakyStore::new(atomic));
        let docs = LedgerDocs::new(store.clone());
        let blobs = Arc::new(MemoryBlobStore::new(store.clone()));
        let provider = Arc::new(MockPaymentProvider::new());
        let orchestrator = BalanceOrchestrator::new(docs.clone(), blobs, provider.clone(), config);

        let uid = Uid::new("alice").unwrap();
        let alice = Principal::User(uid.clone());
        docs.balances.create(&alice, &uid).await.unwrap();

        Fixture {
            store,
            docs,
            provider,
            orchestrator,
            alice,
        }
    }

    async fn fixture() -> Fixture {
        fixture_with(OrchestratorConfig::default(), true).await
    }

    fn alice_uid() -> Uid {
        Uid::new("alice").unwrap()
    }

    async fn balance_of(f: &Fixture, uid: &Uid) -> i64 {
        f.docs
            .balances
            .get(&Principal::Service, uid)
            .await
            .unwrap()
            .unwrap()
            .doc
            .value
    }

    #[tokio::test]
    async fn test_confirm_credits_once() {
        let f = fixture().await;
        let intent = f
            .orchestrator
            .create_payment_intent(Some(&f.alice), 1000)
            .await
            .unwrap();
        assert_eq!(intent.currency, "gbp");

        let confirmed = f
            .orchestrator
            .confirm_payment(Some(&f.alice), &intent.id)
            .await
            .unwrap();
        assert_eq!(confirmed.amount, 1000);
        assert_eq!(confirmed.balance, 1000);
        assert_eq!(confirmed.attempts, 1);

        let replay = f
            .orchestrator
            .confirm_payment(Some(&f.alice), &intent.id)
            .await
            .unwrap_err();
        assert_eq!(replay, ConfirmError::AlreadyApplied);
        assert_eq!(replay.to_string(), "amount already debitted");
        assert_eq!(balance_of(&f, &alice_uid()).await, 1000);

        let record = f
            .docs
            .payment_intents
            .get(&f.alice, &PaymentIntentId::new(intent.id.clone()).unwrap())
            .await
            .unwrap()
            .unwrap();
        assert!(record.doc.is_account_debitted);
    }

    #[tokio::test]
    async fn test_confirm_requires_user() {
        let f = fixture().await;
        assert_eq!(
            f.orchestrator.confirm_payment(None, "pi_1").await.unwrap_err(),
            ConfirmError::Unauthenticated
        );
        assert_eq!(
            f.orchestrator
                .confirm_payment(Some(&Principal::Service), "pi_1")
                .await
                .unwrap_err(),
            ConfirmError::Unauthenticated
        );
        assert!(matches!(
            f.orchestrator.confirm_payment(Some(&f.alice), "  ").await.unwrap_err(),
            ConfirmError::Validation(_)
        ));
    }

    #[tokio::test]
    async fn test_confirm_lookup_failures() {
        let f = fixture().await;
        assert_eq!(
            f.orchestrator
                .confirm_payment(Some(&f.alice), "pi_unknown")
                .await
                .unwrap_err(),
            ConfirmError::PaymentNotFound("pi_unknown".to_string())
        );

        // provider knows it, the ledger never recorded it
        let intent = f.provider.create_payment_intent(500, "gbp").await.unwrap();
        assert_eq!(
            f.orchestrator
                .confirm_payment(Some(&f.alice), &intent.id)
                .await
                .unwrap_err(),
            ConfirmError::RecordNotFound(intent.id.clone())
        );

        f.provider.set_unavailable(true);
        assert!(matches!(
            f.orchestrator
                .confirm_payment(Some(&f.alice), &intent.id)
                .await
                .unwrap_err(),
            ConfirmError::Provider(BridgeError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_confirm_rejects_other_users_intent() {
        let f = fixture().await;
        let intent = f
            .orchestrator
            .create_payment_intent(Some(&f.alice), 1000)
            .await
            .unwrap();

        let mallory = Principal::User(Uid::new("mallory").unwrap());
        let err = f
            .orchestrator
            .confirm_payment(Some(&mallory), &intent.id)
            .await
            .unwrap_err();
        assert_eq!(err, ConfirmError::OwnershipMismatch);
        assert_eq!(balance_of(&f, &alice_uid()).await, 0);
    }

    #[tokio::test]
    async fn test_confirm_checks_currency_and_status() {
        let f = fixture_with(
            OrchestratorConfig {
                require_succeeded: true,
                ..Default::default()
            },
            true,
        )
        .await;

        let intent = f
            .orchestrator
            .create_payment_intent(Some(&f.alice), 700)
            .await
            .unwrap();
        let err = f
            .orchestrator
            .confirm_payment(Some(&f.alice), &intent.id)
            .await
            .unwrap_err();
        assert!(matches!(err, ConfirmError::InvalidPayment(_)));

        assert!(f.provider.set_status(&intent.id, STATUS_SUCCEEDED).await);
        f.orchestrator
            .confirm_payment(Some(&f.alice), &intent.id)
            .await
            .unwrap();

        // recorded under gbp, provider reports usd
        let usd = PaymentIntent {
            id: "pi_usd".to_string(),
            amount: 100,
            currency: "usd".to_string(),
            status: STATUS_SUCCEEDED.to_string(),
            client_secret: None,
        };
        f.provider.insert(usd).await;
        f.docs
            .payment_intents
            .create(&f.alice, &PaymentIntentId::new("pi_usd").unwrap(), &alice_uid())
            .await
            .unwrap();
        let err = f
            .orchestrator
            .confirm_payment(Some(&f.alice), "pi_usd")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "currency must be 'gbp'");
        assert_eq!(balance_of(&f, &alice_uid()).await, 700);
    }

    #[tokio::test]
    async fn test_confirm_without_balance() {
        let f = fixture().await;
        let bob_uid = Uid::new("bob").unwrap();
        let bob = Principal::User(bob_uid);
        let intent = f
            .orchestrator
            .create_payment_intent(Some(&bob), 300)
            .await
            .unwrap();
        assert_eq!(
            f.orchestrator
                .confirm_payment(Some(&bob), &intent.id)
                .await
                .unwrap_err(),
            ConfirmError::BalanceNotFound
        );
    }

    #[tokio::test]
    async fn test_create_payment_intent_validation() {
        let f = fixture().await;
        assert_eq!(
            f.orchestrator.create_payment_intent(None, 100).await.unwrap_err(),
            ConfirmError::Unauthenticated
        );
        assert_eq!(
            f.orchestrator
                .create_payment_intent(Some(&f.alice), 0)
                .await
                .unwrap_err()
                .to_string(),
            "amount must be greater than 0"
        );
        assert!(f.provider.is_empty().await);
    }

    #[tokio::test]
    async fn test_conflict_is_retried() {
        let f = fixture().await;
        let intent = f
            .orchestrator
            .create_payment_intent(Some(&f.alice), 400)
            .await
            .unwrap();

        f.store.conflicts_left.store(1, Ordering::SeqCst);
        let confirmed = f
            .orchestrator
            .confirm_payment(Some(&f.alice), &intent.id)
            .await
            .unwrap();
        assert_eq!(confirmed.attempts, 2);
        assert_eq!(balance_of(&f, &alice_uid()).await, 400);
    }

    #[tokio::test]
    async fn test_conflicts_exhaust_attempts() {
        let f = fixture().await;
        let intent = f
            .orchestrator
            .create_payment_intent(Some(&f.alice), 400)
            .await
            .unwrap();

        f.store.conflicts_left.store(10, Ordering::SeqCst);
        let err = f
            .orchestrator
            .confirm_payment(Some(&f.alice), &intent.id)
            .await
            .unwrap_err();
        assert!(err.is_retryable_conflict());
        assert_eq!(f.store.conflicts_left.load(Ordering::SeqCst), 7);
        assert_eq!(balance_of(&f, &alice_uid()).await, 0);
    }

    #[tokio::test]
    async fn test_atomic_batch_failure_writes_nothing() {
        let f = fixture().await;
        let intent = f
            .orchestrator
            .create_payment_intent(Some(&f.alice), 400)
            .await
            .unwrap();

        f.store.fail_payment_intent_writes.store(true, Ordering::SeqCst);
        let err = f
            .orchestrator
            .confirm_payment(Some(&f.alice), &intent.id)
            .await
            .unwrap_err();
        assert!(matches!(err, ConfirmError::Store(StoreError::Internal(_))));
        assert_eq!(balance_of(&f, &alice_uid()).await, 0);

        f.store.fail_payment_intent_writes.store(false, Ordering::SeqCst);
        f.orchestrator
            .confirm_payment(Some(&f.alice), &intent.id)
            .await
            .unwrap();
        assert_eq!(balance_of(&f, &alice_uid()).await, 400);
    }

    #[tokio::test]
    async fn test_sequential_partial_failure() {
        let f = fixture_with(OrchestratorConfig::default(), false).await;
        assert_eq!(f.orchestrator.config().strategy, CommitStrategy::Sequential);

        let intent = f
            .orchestrator
            .create_payment_intent(Some(&f.alice), 400)
            .await
            .unwrap();
        f.store.fail_payment_intent_writes.store(true, Ordering::SeqCst);

        let err = f
            .orchestrator
            .confirm_payment(Some(&f.alice), &intent.id)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ConfirmError::PartialFailure {
                payment_intent_id: intent.id.clone(),
                uid: "alice".to_string(),
                amount: 400,
            }
        );
        assert_eq!(
            ConfirmOutcome::failed(&err).error.unwrap().message,
            "Could not set paymentIntentDoc isAccountDebitted:true"
        );

        // credited, not marked: the state a reconciliation sweep looks for
        assert_eq!(balance_of(&f, &alice_uid()).await, 400);
        let record = f
            .docs
            .payment_intents
            .get(&Principal::Service, &PaymentIntentId::new(intent.id).unwrap())
            .await
            .unwrap()
            .unwrap();
        assert!(!record.doc.is_account_debitted);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_duplicates_credit_once() {
        let f = Arc::new(fixture().await);
        let intent = f
            .orchestrator
            .create_payment_intent(Some(&f.alice), 250)
            .await
            .unwrap();

        let calls = (0..16).map(|_| {
            let f = f.clone();
            let id = intent.id.clone();
            async move { f.orchestrator.confirm_payment(Some(&f.alice), &id).await }
        });
        let results = futures::future::join_all(calls).await;

        let succeeded = results.iter().filter(|r| r.is_ok()).count();
        let replays = results
            .iter()
            .filter(|r| matches!(r, Err(ConfirmError::AlreadyApplied)))
            .count();
        assert_eq!(succeeded, 1);
        assert_eq!(replays, 15);
        assert_eq!(balance_of(&f, &alice_uid()).await, 250);
    }

    #[tokio::test]
    async fn test_complete_upload_settles_intent() {
        let f = fixture_with(OrchestratorConfig::default(), true).await;
        let intent = f
            .orchestrator
            .create_payment_intent(Some(&f.alice), 600)
            .await
            .unwrap();
        f.orchestrator
            .confirm_payment(Some(&f.alice), &intent.id)
            .await
            .unwrap();

        let upload_id = f.docs.debit_for_upload(&f.alice, &alice_uid()).await.unwrap();
        assert_eq!(upload_id.as_str(), "alice_1");

        let receipt = f
            .orchestrator
            .complete_upload(Some(&f.alice), upload_id.as_str(), b"file-bytes")
            .await
            .unwrap();
        assert_eq!(receipt.key, "uploadFiles/alice_1");
        assert_eq!(receipt.size_bytes, 10);
        assert!(receipt.newly_settled);

        let balance = f
            .docs
            .balances
            .get(&f.alice, &alice_uid())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(balance.doc.value, 300);
        assert_eq!(balance.doc.upload_intent_ids.get("alice_1"), Some(&true));

        let again = f
            .orchestrator
            .complete_upload(Some(&f.alice), upload_id.as_str(), b"file-bytes-v2")
            .await
            .unwrap();
        assert!(!again.newly_settled);
    }

    #[tokio::test]
    async fn test_complete_upload_requires_owned_intent() {
        let f = fixture().await;
        assert_eq!(
            f.orchestrator
                .complete_upload(Some(&f.alice), "alice_1", b"x")
                .await
                .unwrap_err(),
            ConfirmError::AuthorizationDenied
        );
        assert_eq!(
            f.orchestrator
                .complete_upload(None, "alice_1", b"x")
                .await
                .unwrap_err(),
            ConfirmError::Unauthenticated
        );
        assert!(matches!(
            f.orchestrator
                .complete_upload(Some(&f.alice), "", b"x")
                .await
                .unwrap_err(),
            ConfirmError::Validation(_)
        ));
    }
}
