//! Balance Repository

use ledger_core::{
    creatify, updatify, BalanceDoc, DocPath, Principal, Timestamp, Uid, UploadIntentId,
};
use std::sync::Arc;

use super::{decode, Versioned};
use crate::document::DocumentWrite;
use crate::error::{StoreError, StoreResult};
use crate::store::DocumentStore;

/// balanceDocs access
#[derive(Clone)]
pub struct BalanceRepository {
    store: Arc<dyn DocumentStore>,
}

impl BalanceRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn get(
        &self,
        auth: &Principal,
        uid: &Uid,
    ) -> StoreResult<Option<Versioned<BalanceDoc>>> {
        decode(self.store.get(Some(auth), &DocPath::balance(uid)).await?)
    }

    /// Create the caller's empty balance
    pub async fn create(&self, auth: &Principal, uid: &Uid) -> StoreResult<u64> {
        let doc = creatify(BalanceDoc::initial(uid, Timestamp::now()).to_document());
        let result = self
            .store
            .commit(
                Some(auth),
                vec![DocumentWrite::create(DocPath::balance(uid), doc)],
            )
            .await?;
        Ok(result.versions.first().copied().unwrap_or(1))
    }

    /// Apply the debit transition to the caller's balance.
    ///
    /// Returns the id of the new pending upload intent. The write carries a
    /// version precondition, so a concurrent change surfaces as a conflict
    /// instead of a lost update.
    pub async fn debit(&self, auth: &Principal, uid: &Uid) -> StoreResult<UploadIntentId> {
        let current = self
            .get(auth, uid)
            .await?
            .ok_or_else(|| StoreError::not_found(DocPath::balance(uid)))?;
        let id = current.doc.next_upload_intent_id();
        self.store
            .commit(Some(auth), vec![Self::debit_write(&current)])
            .await?;
        tracing::debug!(uid = %uid, upload_intent_id = %id, "balance debited");
        Ok(id)
    }

    pub fn debit_write(current: &Versioned<BalanceDoc>) -> DocumentWrite {
        transition_write(current, current.doc.debited())
    }

    /// Credit transition; the service principal must commit it
    pub fn credit_write(
        current: &Versioned<BalanceDoc>,
        amount: i64,
    ) -> StoreResult<DocumentWrite> {
        Ok(transition_write(current, current.doc.credited(amount)?))
    }

    /// Settle transition; the service principal must commit it
    pub fn settle_write(
        current: &Versioned<BalanceDoc>,
        id: &UploadIntentId,
    ) -> StoreResult<DocumentWrite> {
        Ok(transition_write(current, current.doc.settled(id)?))
    }
}

fn transition_write(current: &Versioned<BalanceDoc>, next: BalanceDoc) -> DocumentWrite {
    DocumentWrite::update(
        DocPath::balance(&current.doc.uid),
        updatify(next.to_document()),
        current.version,
    )
}
