//! Blob upload rule: `uploadFiles/{uploadIntentId}`

use super::predicates::owned_by;
use super::{Decision, DenyReason, DocumentLookup};
use crate::types::{DocPath, Principal, UploadIntentId};

/// Grant an upload iff the caller owns the matching upload intent document
pub fn authorize_blob_upload(
    principal: Option<&Principal>,
    upload_intent_id: &UploadIntentId,
    lookup: &dyn DocumentLookup,
) -> Decision {
    let check = match principal {
        Some(Principal::User(uid)) => lookup
            .lookup(&DocPath::upload_intent(upload_intent_id))
            .ok_or(DenyReason::MissingDependency)
            .and_then(|doc| owned_by(doc, uid)),
        Some(Principal::Service) => Err(DenyReason::OperationNotAllowed),
        None => Err(DenyReason::Unauthenticated),
    };

    let decision = Decision::from(check);
    if let Decision::Deny(reason) = &decision {
        tracing::debug!(
            upload_intent_id = %upload_intent_id,
            principal = ?principal,
            reason = %reason,
            "blob upload denied"
        );
    }
    decision
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::EmptyLookup;
    use crate::types::{Document, Timestamp, Uid, UploadIntentDoc};
    use std::collections::HashMap;

    #[test]
    fn test_upload_requires_owned_intent() {
        let owner = Uid::new("uid124").unwrap();
        let id = UploadIntentId::for_counter(&owner, 2);
        let mut store: HashMap<DocPath, Document> = HashMap::new();
        store.insert(
            DocPath::upload_intent(&id),
            UploadIntentDoc::new(&id, &owner, Timestamp::now()).to_document(),
        );

        let me = Principal::User(owner);
        let intruder = Principal::User(Uid::new("uid123").unwrap());

        assert!(authorize_blob_upload(Some(&me), &id, &store).is_granted());
        assert_eq!(
            authorize_blob_upload(Some(&intruder), &id, &store),
            Decision::Deny(DenyReason::OwnerMismatch)
        );
        assert!(!authorize_blob_upload(None, &id, &store).is_granted());
        assert_eq!(
            authorize_blob_upload(Some(&me), &id, &EmptyLookup),
            Decision::Deny(DenyReason::MissingDependency)
        );
    }
}
