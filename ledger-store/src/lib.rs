//! Ledger Store - Rule-Enforced Document and Blob Storage
//!
//! Provides the storage collaborators of the ledger:
//! - [`DocumentStore`]: versioned documents, preconditioned batch commits,
//!   rules evaluated on every read and write
//! - [`MemoryDocumentStore`]: in-memory implementation used for
//!   development and tests
//! - [`BlobStore`]: upload files keyed by upload intent id
//! - typed repositories over the three ledger collections
//!
//! # Usage Example
//!
//! ```ignore
//! use ledger_store::{LedgerDocs, MemoryDocumentStore};
//! use ledger_core::{Principal, Uid};
//! use std::sync::Arc;
//!
//! async fn example() {
//!     let docs = LedgerDocs::new(Arc::new(MemoryDocumentStore::new()));
//!     let uid = Uid::new("uid123").unwrap();
//!     let me = Principal::User(uid.clone());
//!
//!     docs.balances.create(&me, &uid).await.unwrap();
//!     let balance = docs.balances.get(&me, &uid).await.unwrap();
//! }
//! ```

pub mod blob;
pub mod document;
pub mod error;
pub mod memory;
pub mod repos;
pub mod store;

pub use blob::{BlobMetadata, BlobRef, BlobStore, MemoryBlobStore};
pub use document::{CommitResult, DocumentWrite, Precondition, StoredDocument};
pub use error::{StoreError, StoreResult};
pub use memory::{Clock, FixedClock, MemoryDocumentStore, SystemClock};
pub use repos::*;
pub use store::DocumentStore;

use ledger_core::{Principal, Uid, UploadIntentId};
use std::sync::Arc;

/// Ledger collections facade
#[derive(Clone)]
pub struct LedgerDocs {
    store: Arc<dyn DocumentStore>,
    /// Balance repository
    pub balances: BalanceRepository,
    /// Payment intent repository
    pub payment_intents: PaymentIntentRepository,
    /// Upload intent repository
    pub upload_intents: UploadIntentRepository,
}

impl LedgerDocs {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            balances: BalanceRepository::new(store.clone()),
            payment_intents: PaymentIntentRepository::new(store.clone()),
            upload_intents: UploadIntentRepository::new(store.clone()),
            store,
        }
    }

    /// Get the underlying store
    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// Debit the caller's balance, then record the upload intent.
    ///
    /// Two writes in this order: the upload intent rule reads the committed
    /// balance, so recording first would be denied.
    pub async fn debit_for_upload(&self, auth: &Principal, uid: &Uid) -> StoreResult<UploadIntentId> {
        let id = self.balances.debit(auth, uid).await?;
        self.upload_intents.record(auth, &id, uid).await?;
        Ok(id)
    }
}
