//! Document Authorization Rules
//!
//! Pure decision functions evaluated by the store for every proposed access.
//! A write is judged only from the caller, the stored state, the proposed
//! state and the request time; there is no partial apply.
//!
//! - balanceDocs: create once empty; users may only debit, the service may
//!   only credit or settle
//! - paymentIntentDocs: created unapplied by the owner, flipped once by the service
//! - uploadIntentDocs: created only for a pending debit already on the balance
//! - blobs: uploadable only for an upload intent the caller owns

mod balance;
mod blob;
mod payment_intent;
pub mod predicates;
mod upload_intent;

pub use blob::authorize_blob_upload;

use std::collections::HashMap;
use thiserror::Error;

use crate::types::{Collection, DocPath, Document, Principal, Timestamp};

/// Outcome of a rule evaluation
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Decision {
    Grant,
    /// The reason is for logs and tests; stores report a bare denial
    Deny(DenyReason),
}

impl Decision {
    pub fn is_granted(&self) -> bool {
        matches!(self, Decision::Grant)
    }

    pub fn deny_reason(&self) -> Option<&DenyReason> {
        match self {
            Decision::Grant => None,
            Decision::Deny(reason) => Some(reason),
        }
    }
}

impl From<RuleCheck> for Decision {
    fn from(check: RuleCheck) -> Self {
        match check {
            Ok(()) => Decision::Grant,
            Err(reason) => Decision::Deny(reason),
        }
    }
}

/// Which predicate rejected the request
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum DenyReason {
    #[error("request is not authenticated")]
    Unauthenticated,

    #[error("operation not permitted for this principal")]
    OperationNotAllowed,

    #[error("key set mismatch (missing: {missing:?}, unexpected: {unexpected:?})")]
    Shape {
        missing: Vec<String>,
        unexpected: Vec<String>,
    },

    #[error("field {field} has the wrong type")]
    FieldType { field: String },

    #[error("document id does not match its key")]
    IdMismatch,

    #[error("document is not owned by the caller")]
    OwnerMismatch,

    #[error("field {field} is not the request time")]
    NotRequestTime { field: String },

    #[error("field {field} is immutable")]
    Immutable { field: String },

    #[error("initial state is invalid: {0}")]
    InvalidInitialState(&'static str),

    #[error("update does not match a permitted transition: {0}")]
    InvalidTransition(&'static str),

    #[error("balance would become negative")]
    NegativeBalance,

    #[error("referenced document does not exist")]
    MissingDependency,

    #[error("upload intent is not pending on the balance")]
    NotPending,

    #[error("document does not exist")]
    NotFound,
}

/// Internal predicate result
pub type RuleCheck = Result<(), DenyReason>;

/// A proposed write, with server timestamps already resolved
#[derive(Clone, Copy, Debug)]
pub struct WriteRequest<'a> {
    /// `None` when the request carries no identity
    pub principal: Option<&'a Principal>,
    pub path: &'a DocPath,
    /// Stored state; `None` on create
    pub before: Option<&'a Document>,
    /// Full proposed state
    pub after: &'a Document,
    /// The store's "now" for this request
    pub request_time: Timestamp,
}

impl<'a> WriteRequest<'a> {
    pub fn is_create(&self) -> bool {
        self.before.is_none()
    }
}

/// Read access to the store's current state during rule evaluation
pub trait DocumentLookup {
    fn lookup(&self, path: &DocPath) -> Option<&Document>;
}

impl DocumentLookup for HashMap<DocPath, Document> {
    fn lookup(&self, path: &DocPath) -> Option<&Document> {
        self.get(path)
    }
}

/// Lookup over nothing
pub struct EmptyLookup;

impl DocumentLookup for EmptyLookup {
    fn lookup(&self, _path: &DocPath) -> Option<&Document> {
        None
    }
}

/// Decide a create or update.
///
/// `lookup` must reflect the state before the write (and before any other
/// write of the same batch).
pub fn authorize_write(request: &WriteRequest<'_>, lookup: &dyn DocumentLookup) -> Decision {
    let decision: Decision = match request.principal {
        None => Err(DenyReason::Unauthenticated),
        Some(principal) => match request.path.collection {
            Collection::BalanceDocs => balance::check_write(principal, request),
            Collection::PaymentIntentDocs => payment_intent::check_write(principal, request),
            Collection::UploadIntentDocs => upload_intent::check_write(principal, request, lookup),
        },
    }
    .into();

    if let Decision::Deny(reason) = &decision {
        tracing::debug!(
            path = %request.path,
            principal = ?request.principal,
            create = request.is_create(),
            reason = %reason,
            "write denied"
        );
    }
    decision
}

/// Decide a read. `existing` is the stored document, if any.
pub fn authorize_read(
    principal: Option<&Principal>,
    path: &DocPath,
    existing: Option<&Document>,
) -> Decision {
    let check = match principal {
        None => Err(DenyReason::Unauthenticated),
        Some(Principal::Service) => Ok(()),
        Some(Principal::User(uid)) => match path.collection {
            Collection::BalanceDocs if path.key == uid.as_str() => Ok(()),
            Collection::BalanceDocs => Err(DenyReason::OwnerMismatch),
            Collection::PaymentIntentDocs | Collection::UploadIntentDocs => match existing {
                Some(doc) => predicates::owned_by(doc, uid),
                None => Err(DenyReason::NotFound),
            },
        },
    };

    let decision = Decision::from(check);
    if let Decision::Deny(reason) = &decision {
        tracing::debug!(path = %path, principal = ?principal, reason = %reason, "read denied");
    }
    decision
}



#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Uid;

    #[test]
    fn test_unauthenticated_write_is_denied() {
        let path = DocPath::new(Collection::BalanceDocs, "uid123");
        let after = fixtures::balance("uid123").to_document();
        let request = WriteRequest {
            principal: None,
            path: &path,
            before: None,
            after: &after,
            request_time: fixtures::created_at(),
        };
        assert_eq!(
            authorize_write(&request, &EmptyLookup),
            Decision::Deny(DenyReason::Unauthenticated)
        );
    }

    #[test]
    fn test_read_balance_owner_only() {
        let me = Principal::User(Uid::new("uid123").unwrap());
        let mine = DocPath::new(Collection::BalanceDocs, "uid123");
        let theirs = DocPath::new(Collection::BalanceDocs, "uid124");

        assert!(authorize_read(Some(&me), &mine, None).is_granted());
        assert!(!authorize_read(Some(&me), &theirs, None).is_granted());
        assert!(!authorize_read(None, &mine, None).is_granted());
        assert!(authorize_read(Some(&Principal::Service), &theirs, None).is_granted());
    }

    #[test]
    fn test_read_payment_intent_by_stored_owner() {
        let me = Principal::User(Uid::new("uid123").unwrap());
        let other = Principal::User(Uid::new("uid124").unwrap());
        let path = DocPath::new(Collection::PaymentIntentDocs, "pi_1");

        let mut doc = Document::new();
        doc.insert("uid".into(), "uid123".into());

        assert!(authorize_read(Some(&me), &path, Some(&doc)).is_granted());
        assert_eq!(
            authorize_read(Some(&other), &path, Some(&doc)).deny_reason(),
            Some(&DenyReason::OwnerMismatch)
        );
        assert_eq!(
            authorize_read(Some(&me), &path, None).deny_reason(),
            Some(&DenyReason::NotFound)
        );
    }
}
