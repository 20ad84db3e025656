//! Blob storage for uploaded files
//!
//! Objects live under `uploadFiles/{uploadIntentId}`; an upload is allowed
//! only while the caller owns the matching upload intent document.

use async_trait::async_trait;
use ledger_core::{authorize_blob_upload, DocPath, Principal, UploadIntentId};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::{StoreError, StoreResult};
use crate::store::DocumentStore;

/// Object key in the blob store
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct BlobRef {
    upload_intent_id: UploadIntentId,
}

impl BlobRef {
    pub const UPLOAD_PREFIX: &'static str = "uploadFiles";

    /// `uploadFiles/{id}`
    pub fn upload_file(upload_intent_id: &UploadIntentId) -> Self {
        Self {
            upload_intent_id: upload_intent_id.clone(),
        }
    }

    pub fn upload_intent_id(&self) -> &UploadIntentId {
        &self.upload_intent_id
    }

    pub fn key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for BlobRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", Self::UPLOAD_PREFIX, self.upload_intent_id)
    }
}

/// Metadata of a stored object
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlobMetadata {
    pub key: String,
    pub size_bytes: u64,
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `data` at `blob_ref`, evaluated as `auth`
    async fn upload_bytes(
        &self,
        auth: Option<&Principal>,
        blob_ref: &BlobRef,
        data: &[u8],
    ) -> StoreResult<BlobMetadata>;

    /// Read an object back, evaluated as `auth`
    async fn read(&self, auth: Option<&Principal>, blob_ref: &BlobRef) -> StoreResult<Vec<u8>>;

    async fn exists(&self, blob_ref: &BlobRef) -> StoreResult<bool>;
}

/// In-memory [`BlobStore`] authorized against a document store
pub struct MemoryBlobStore {
    objects: RwLock<HashMap<String, Vec<u8>>>,
    documents: Arc<dyn DocumentStore>,
}

impl MemoryBlobStore {
    pub fn new(documents: Arc<dyn DocumentStore>) -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
            documents,
        }
    }

    /// Upload intent document owned by the caller, checked by the blob rule
    async fn check_upload(&self, auth: Option<&Principal>, blob_ref: &BlobRef) -> StoreResult<()> {
        let path = DocPath::upload_intent(blob_ref.upload_intent_id());
        let intent = self
            .documents
            .get(Some(&Principal::Service), &path)
            .await?
            .map(|stored| stored.data);

        let lookup: HashMap<_, _> = intent.into_iter().map(|data| (path.clone(), data)).collect();
        if authorize_blob_upload(auth, blob_ref.upload_intent_id(), &lookup).is_granted() {
            Ok(())
        } else {
            Err(StoreError::PermissionDenied)
        }
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn upload_bytes(
        &self,
        auth: Option<&Principal>,
        blob_ref: &BlobRef,
        data: &[u8],
    ) -> StoreResult<BlobMetadata> {
        self.check_upload(auth, blob_ref).await?;

        let key = blob_ref.key();
        self.objects.write().await.insert(key.clone(), data.to_vec());
        tracing::debug!(key = %key, size = data.len(), "blob uploaded");

        Ok(BlobMetadata {
            key,
            size_bytes: data.len() as u64,
        })
    }

    async fn read(&self, auth: Option<&Principal>, blob_ref: &BlobRef) -> StoreResult<Vec<u8>> {
        // same ownership condition as uploads
        if !matches!(auth, Some(Principal::Service)) {
            self.check_upload(auth, blob_ref).await?;
        }
        self.objects
            .read()
            .await
            .get(&blob_ref.key())
            .cloned()
            .ok_or_else(|| StoreError::not_found(blob_ref))
    }

    async fn exists(&self, blob_ref: &BlobRef) -> StoreResult<bool> {
        Ok(self.objects.read().await.contains_key(&blob_ref.key()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryDocumentStore;
    use ledger_core::{Timestamp, Uid, UploadIntentDoc};

    async fn store_with_intent(owner: &Uid, id: &UploadIntentId) -> Arc<MemoryDocumentStore> {
        let docs = Arc::new(MemoryDocumentStore::new());
        docs.seed(
            DocPath::upload_intent(id),
            UploadIntentDoc::new(id, owner, Timestamp::now()).to_document(),
        )
        .await;
        docs
    }

    #[test]
    fn test_blob_ref_key() {
        let id = UploadIntentId::new("uid124_2").unwrap();
        assert_eq!(BlobRef::upload_file(&id).key(), "uploadFiles/uid124_2");
    }

    #[tokio::test]
    async fn test_owner_can_upload() {
        let owner = Uid::new("uid124").unwrap();
        let id = UploadIntentId::for_counter(&owner, 2);
        let blobs = MemoryBlobStore::new(store_with_intent(&owner, &id).await);
        let blob_ref = BlobRef::upload_file(&id);
        let me = Principal::User(owner);

        let meta = blobs.upload_bytes(Some(&me), &blob_ref, b"qr-bytes").await.unwrap();
        assert_eq!(meta.size_bytes, 8);
        assert!(blobs.exists(&blob_ref).await.unwrap());
        assert_eq!(blobs.read(Some(&me), &blob_ref).await.unwrap(), b"qr-bytes".to_vec());
    }

    #[tokio::test]
    async fn test_upload_denied_without_owned_intent() {
        let owner = Uid::new("uid124").unwrap();
        let id = UploadIntentId::for_counter(&owner, 2);
        let blobs = MemoryBlobStore::new(store_with_intent(&owner, &id).await);

        let intruder = Principal::User(Uid::new("uid123").unwrap());
        let err = blobs
            .upload_bytes(Some(&intruder), &BlobRef::upload_file(&id), b"x")
            .await
            .unwrap_err();
        assert!(err.is_permission_denied());

        let missing = UploadIntentId::for_counter(&owner, 3);
        let me = Principal::User(owner);
        assert!(blobs
            .upload_bytes(Some(&me), &BlobRef::upload_file(&missing), b"x")
            .await
            .unwrap_err()
            .is_permission_denied());
        assert!(!blobs.exists(&BlobRef::upload_file(&missing)).await.unwrap());
    }
}
