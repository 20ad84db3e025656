//! Document store contract

use async_trait::async_trait;
use ledger_core::{DocPath, Document, Principal};

use crate::document::{CommitResult, DocumentWrite, StoredDocument};
use crate::error::{StoreError, StoreResult};

/// Document store with rule-enforced access
///
/// Every call is evaluated as `auth` (`None` = unauthenticated). Rule
/// denials surface as [`StoreError::PermissionDenied`] without detail.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Read one document. `Ok(None)` when absent and the caller may know that.
    async fn get(
        &self,
        auth: Option<&Principal>,
        path: &DocPath,
    ) -> StoreResult<Option<StoredDocument>>;

    /// Apply a batch of writes.
    ///
    /// Atomic stores apply all or none. Preconditions and rules are checked
    /// for every write against the state before the batch, and all writes
    /// share one commit time that replaces any server timestamp sentinel.
    async fn commit(
        &self,
        auth: Option<&Principal>,
        writes: Vec<DocumentWrite>,
    ) -> StoreResult<CommitResult>;

    /// Unconditional single-document write; returns the new version
    async fn set(
        &self,
        auth: Option<&Principal>,
        path: &DocPath,
        data: Document,
    ) -> StoreResult<u64> {
        let result = self
            .commit(auth, vec![DocumentWrite::set(path.clone(), data)])
            .await?;
        result
            .versions
            .first()
            .copied()
            .ok_or_else(|| StoreError::Internal("commit returned no version".to_string()))
    }

    /// Whether multi-write batches are applied atomically
    fn supports_atomic_commit(&self) -> bool {
        true
    }
}
