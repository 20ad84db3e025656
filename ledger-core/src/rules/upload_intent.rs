//! uploadIntentDocs rules
//!
//! An upload intent may only be created for an id the caller's balance
//! already holds as pending. The balance is read from current state, so the
//! debit has to be committed before the intent is recorded.

use super::predicates::{id_is_key, is_request_time, map_field, owned_by, shape};
use super::{DenyReason, DocumentLookup, RuleCheck, WriteRequest};
use crate::schema::{fields, UPLOAD_INTENT_DOC_SCHEMA};
use crate::types::{DocPath, FieldValue, Principal, Uid};

pub(super) fn check_write(
    principal: &Principal,
    request: &WriteRequest<'_>,
    lookup: &dyn DocumentLookup,
) -> RuleCheck {
    match (principal, request.before) {
        (Principal::User(uid), None) => check_create(uid, request, lookup),
        _ => Err(DenyReason::OperationNotAllowed),
    }
}

fn check_create(uid: &Uid, request: &WriteRequest<'_>, lookup: &dyn DocumentLookup) -> RuleCheck {
    let after = request.after;
    shape(&UPLOAD_INTENT_DOC_SCHEMA, after)?;
    id_is_key(after, request.path)?;
    owned_by(after, uid)?;
    is_request_time(after, fields::CREATED_AT, request.request_time)?;
    is_request_time(after, fields::UPDATED_AT, request.request_time)?;

    let balance = lookup
        .lookup(&DocPath::balance(uid))
        .ok_or(DenyReason::MissingDependency)?;
    match map_field(balance, fields::UPLOAD_INTENT_IDS)?.get(&request.path.key) {
        Some(FieldValue::Boolean(false)) => Ok(()),
        _ => Err(DenyReason::NotPending),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::fixtures::{balance, uid};
    use crate::rules::{authorize_write, Decision, EmptyLookup};
    use crate::types::{Document, Timestamp, UploadIntentDoc, UploadIntentId};
    use std::collections::HashMap;

    fn store_with(docs: Vec<(DocPath, Document)>) -> HashMap<DocPath, Document> {
        docs.into_iter().collect()
    }

    fn decide(
        principal: &Principal,
        id: &UploadIntentId,
        after: &Document,
        now: Timestamp,
        lookup: &dyn DocumentLookup,
    ) -> Decision {
        let path = DocPath::upload_intent(id);
        authorize_write(
            &WriteRequest {
                principal: Some(principal),
                path: &path,
                before: None,
                after,
                request_time: now,
            },
            lookup,
        )
    }

    fn pending_store() -> (HashMap<DocPath, Document>, UploadIntentId) {
        let debited = balance("uid124").debited();
        let id = UploadIntentId::for_counter(&debited.uid, 2);
        (
            store_with(vec![(DocPath::balance(&debited.uid), debited.to_document())]),
            id,
        )
    }

    #[test]
    fn test_create_for_pending_debit() {
        let now = Timestamp::now();
        let (store, id) = pending_store();
        let me = Principal::User(uid("uid124"));
        let doc = UploadIntentDoc::new(&id, &uid("uid124"), now).to_document();
        assert!(decide(&me, &id, &doc, now, &store).is_granted());
    }

    #[test]
    fn test_create_requires_pending_entry() {
        let now = Timestamp::now();
        let me = Principal::User(uid("uid124"));

        // key absent from the map: no debit recorded yet
        let store = store_with(vec![(
            DocPath::balance(&uid("uid124")),
            balance("uid124").to_document(),
        )]);
        let id = UploadIntentId::for_counter(&uid("uid124"), 2);
        let doc = UploadIntentDoc::new(&id, &uid("uid124"), now).to_document();
        assert_eq!(
            decide(&me, &id, &doc, now, &store),
            Decision::Deny(DenyReason::NotPending)
        );

        // already settled
        let settled = UploadIntentId::for_counter(&uid("uid124"), 1);
        let doc = UploadIntentDoc::new(&settled, &uid("uid124"), now).to_document();
        assert!(!decide(&me, &settled, &doc, now, &store).is_granted());

        // no balance document at all
        assert_eq!(
            decide(&me, &id, &UploadIntentDoc::new(&id, &uid("uid124"), now).to_document(), now, &EmptyLookup),
            Decision::Deny(DenyReason::MissingDependency)
        );
    }

    #[test]
    fn test_create_shape_identity_and_time() {
        let now = Timestamp::now();
        let (store, id) = pending_store();
        let me = Principal::User(uid("uid124"));
        let doc = UploadIntentDoc::new(&id, &uid("uid124"), now).to_document();

        for key in doc.keys() {
            let mut missing = doc.clone();
            missing.remove(key);
            assert!(!decide(&me, &id, &missing, now, &store).is_granted());
        }
        let mut extra = doc.clone();
        extra.insert("someOtherKey".into(), true.into());
        assert!(!decide(&me, &id, &extra, now, &store).is_granted());

        let mut wrong_id = doc.clone();
        wrong_id.insert(fields::ID.into(), "uid124_3".into());
        assert!(!decide(&me, &id, &wrong_id, now, &store).is_granted());

        let stale = UploadIntentDoc::new(&id, &uid("uid124"), now.shifted_nanos(-1)).to_document();
        assert!(!decide(&me, &id, &stale, now, &store).is_granted());
    }

    #[test]
    fn test_create_for_someone_elses_intent() {
        let now = Timestamp::now();
        let (store, id) = pending_store();
        let intruder = Principal::User(uid("uid123"));

        let as_owner = UploadIntentDoc::new(&id, &uid("uid124"), now).to_document();
        assert!(!decide(&intruder, &id, &as_owner, now, &store).is_granted());

        // claiming it as their own still finds no pending entry on their balance
        let as_self = UploadIntentDoc::new(&id, &uid("uid123"), now).to_document();
        assert!(!decide(&intruder, &id, &as_self, now, &store).is_granted());
    }

    #[test]
    fn test_updates_and_service_creates_are_denied() {
        let now = Timestamp::now();
        let (store, id) = pending_store();
        let doc = UploadIntentDoc::new(&id, &uid("uid124"), now).to_document();
        assert_eq!(
            decide(&Principal::Service, &id, &doc, now, &store),
            Decision::Deny(DenyReason::OperationNotAllowed)
        );

        let path = DocPath::upload_intent(&id);
        let me = Principal::User(uid("uid124"));
        let update = authorize_write(
            &WriteRequest {
                principal: Some(&me),
                path: &path,
                before: Some(&doc),
                after: &doc,
                request_time: now,
            },
            &store,
        );
        assert_eq!(update, Decision::Deny(DenyReason::OperationNotAllowed));
    }
}
