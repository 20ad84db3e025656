//! paymentIntentDocs rules
//!
//! Created unapplied by the owner; flipped to applied exactly once, by the service.

use super::predicates::{bool_field, id_is_key, is_request_time, only_changes, owned_by, shape};
use super::{DenyReason, RuleCheck, WriteRequest};
use crate::schema::{fields, PAYMENT_INTENT_DOC_SCHEMA};
use crate::types::{Document, Principal, Uid};

pub(super) fn check_write(principal: &Principal, request: &WriteRequest<'_>) -> RuleCheck {
    match (principal, request.before) {
        (Principal::User(uid), None) => check_create(uid, request),
        (Principal::Service, Some(before)) => check_mark_debitted(request, before),
        _ => Err(DenyReason::OperationNotAllowed),
    }
}

fn check_create(uid: &Uid, request: &WriteRequest<'_>) -> RuleCheck {
    let after = request.after;
    shape(&PAYMENT_INTENT_DOC_SCHEMA, after)?;
    id_is_key(after, request.path)?;
    owned_by(after, uid)?;
    if bool_field(after, fields::IS_ACCOUNT_DEBITTED)? {
        return Err(DenyReason::InvalidInitialState(
            "isAccountDebitted must start false",
        ));
    }
    is_request_time(after, fields::CREATED_AT, request.request_time)?;
    is_request_time(after, fields::UPDATED_AT, request.request_time)
}

fn check_mark_debitted(request: &WriteRequest<'_>, before: &Document) -> RuleCheck {
    let after = request.after;
    shape(&PAYMENT_INTENT_DOC_SCHEMA, after)?;
    id_is_key(after, request.path)?;
    only_changes(
        before,
        after,
        &[fields::IS_ACCOUNT_DEBITTED, fields::UPDATED_AT],
    )?;
    let was = bool_field(before, fields::IS_ACCOUNT_DEBITTED)?;
    let is = bool_field(after, fields::IS_ACCOUNT_DEBITTED)?;
    if was || !is {
        return Err(DenyReason::InvalidTransition(
            "isAccountDebitted only moves from false to true",
        ));
    }
    is_request_time(after, fields::UPDATED_AT, request.request_time)
}


