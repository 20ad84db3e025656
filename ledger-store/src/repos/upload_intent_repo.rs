//! Upload Intent Repository

use ledger_core::{
    creatify, DocPath, Principal, Timestamp, Uid, UploadIntentDoc, UploadIntentId,
};
use std::sync::Arc;

use super::{decode, Versioned};
use crate::document::DocumentWrite;
use crate::error::StoreResult;
use crate::store::DocumentStore;

/// uploadIntentDocs access
#[derive(Clone)]
pub struct UploadIntentRepository {
    store: Arc<dyn DocumentStore>,
}

impl UploadIntentRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn get(
        &self,
        auth: &Principal,
        id: &UploadIntentId,
    ) -> StoreResult<Option<Versioned<UploadIntentDoc>>> {
        decode(self.store.get(Some(auth), &DocPath::upload_intent(id)).await?)
    }

    /// Record an upload intent; only succeeds once the debit is committed
    pub async fn record(
        &self,
        auth: &Principal,
        id: &UploadIntentId,
        uid: &Uid,
    ) -> StoreResult<u64> {
        let doc = creatify(UploadIntentDoc::new(id, uid, Timestamp::now()).to_document());
        let result = self
            .store
            .commit(
                Some(auth),
                vec![DocumentWrite::create(DocPath::upload_intent(id), doc)],
            )
            .await?;
        Ok(result.versions.first().copied().unwrap_or(1))
    }
}
