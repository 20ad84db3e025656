//! Payment Intent Repository

use ledger_core::{
    creatify, updatify, DocPath, PaymentIntentDoc, PaymentIntentId, Principal, Timestamp, Uid,
};
use std::sync::Arc;

use super::{decode, Versioned};
use crate::document::DocumentWrite;
use crate::error::StoreResult;
use crate::store::DocumentStore;

/// paymentIntentDocs access
#[derive(Clone)]
pub struct PaymentIntentRepository {
    store: Arc<dyn DocumentStore>,
}

impl PaymentIntentRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn get(
        &self,
        auth: &Principal,
        id: &PaymentIntentId,
    ) -> StoreResult<Option<Versioned<PaymentIntentDoc>>> {
        decode(self.store.get(Some(auth), &DocPath::payment_intent(id)).await?)
    }

    /// Record a provider payment-intent for `uid`, not yet applied
    pub async fn create(
        &self,
        auth: &Principal,
        id: &PaymentIntentId,
        uid: &Uid,
    ) -> StoreResult<u64> {
        let doc = creatify(PaymentIntentDoc::new(id, uid, Timestamp::now()).to_document());
        let result = self
            .store
            .commit(
                Some(auth),
                vec![DocumentWrite::create(DocPath::payment_intent(id), doc)],
            )
            .await?;
        Ok(result.versions.first().copied().unwrap_or(1))
    }

    /// Flip `isAccountDebitted` to true; the service principal must commit it
    pub fn mark_debitted_write(current: &Versioned<PaymentIntentDoc>) -> DocumentWrite {
        DocumentWrite::update(
            DocPath::payment_intent(&current.doc.id),
            updatify(current.doc.debitted().to_document()),
            current.version,
        )
    }
}
