//! balanceDocs rules
//!
//! - create: owner only, `value = 0`, counter `0`, no upload intents
//! - user update: the debit transition only
//! - service update: the credit or the settle transition

use super::predicates::{
    id_is_key, integer_field, is_request_time, map_field, only_changes, owned_by, shape,
    unchanged,
};
use super::{DenyReason, RuleCheck, WriteRequest};
use crate::schema::{fields, BALANCE_DOC_SCHEMA, BALANCE_UPDATABLE_KEYS};
use crate::types::{Document, FieldValue, Principal, Uid, UploadIntentId, UPLOAD_INTENT_COST};

pub(super) fn check_write(principal: &Principal, request: &WriteRequest<'_>) -> RuleCheck {
    match (principal, request.before) {
        (Principal::User(uid), None) => check_create(uid, request),
        (Principal::User(uid), Some(before)) => check_debit(uid, request, before),
        (Principal::Service, Some(before)) => check_service_update(request, before),
        (Principal::Service, None) => Err(DenyReason::OperationNotAllowed),
    }
}

fn check_create(uid: &Uid, request: &WriteRequest<'_>) -> RuleCheck {
    let after = request.after;
    shape(&BALANCE_DOC_SCHEMA, after)?;
    id_is_key(after, request.path)?;
    owned_by(after, uid)?;
    if request.path.key != uid.as_str() {
        return Err(DenyReason::OwnerMismatch);
    }

    if integer_field(after, fields::VALUE)? != 0 {
        return Err(DenyReason::InvalidInitialState("value must start at 0"));
    }
    if integer_field(after, fields::CURRENT_UPLOAD_INTENT_NUMBER)? != 0 {
        return Err(DenyReason::InvalidInitialState(
            "currentUploadIntentNumber must start at 0",
        ));
    }
    if !map_field(after, fields::UPLOAD_INTENT_IDS)?.is_empty() {
        return Err(DenyReason::InvalidInitialState(
            "uploadIntentIds must start empty",
        ));
    }

    is_request_time(after, fields::CREATED_AT, request.request_time)?;
    is_request_time(after, fields::UPDATED_AT, request.request_time)
}

/// Checks common to every update, whoever the caller is
fn check_update_frame(request: &WriteRequest<'_>, before: &Document) -> RuleCheck {
    let after = request.after;
    shape(&BALANCE_DOC_SCHEMA, after)?;
    id_is_key(after, request.path)?;
    only_changes(before, after, &BALANCE_UPDATABLE_KEYS)?;
    is_request_time(after, fields::UPDATED_AT, request.request_time)
}

/// Numeric state of a balance document
struct Counters {
    value: i64,
    counter: i64,
}

impl Counters {
    fn read(doc: &Document) -> Result<Self, DenyReason> {
        Ok(Self {
            value: integer_field(doc, fields::VALUE)?,
            counter: integer_field(doc, fields::CURRENT_UPLOAD_INTENT_NUMBER)?,
        })
    }
}

fn check_debit(uid: &Uid, request: &WriteRequest<'_>, before: &Document) -> RuleCheck {
    if request.path.key != uid.as_str() {
        return Err(DenyReason::OwnerMismatch);
    }
    owned_by(before, uid)?;
    check_update_frame(request, before)?;
    owned_by(request.after, uid)?;

    let old = Counters::read(before)?;
    let new = Counters::read(request.after)?;

    if old.counter.checked_add(1) != Some(new.counter) {
        return Err(DenyReason::InvalidTransition(
            "debit must increment currentUploadIntentNumber by 1",
        ));
    }
    if old.value.checked_sub(UPLOAD_INTENT_COST) != Some(new.value) {
        return Err(DenyReason::InvalidTransition(
            "debit must decrease value by the upload intent cost",
        ));
    }
    if new.value < 0 {
        return Err(DenyReason::NegativeBalance);
    }

    let old_ids = map_field(before, fields::UPLOAD_INTENT_IDS)?;
    let new_ids = map_field(request.after, fields::UPLOAD_INTENT_IDS)?;
    let new_key = UploadIntentId::for_counter(uid, new.counter);

    if new_ids.len() != old_ids.len() + 1 {
        return Err(DenyReason::InvalidTransition(
            "debit must add exactly one upload intent",
        ));
    }
    if old_ids.contains_key(new_key.as_str())
        || new_ids.get(new_key.as_str()) != Some(&FieldValue::Boolean(false))
    {
        return Err(DenyReason::InvalidTransition(
            "new upload intent must be keyed by the new counter and pending",
        ));
    }
    if old_ids.iter().any(|(k, v)| new_ids.get(k) != Some(v)) {
        return Err(DenyReason::InvalidTransition(
            "existing upload intents are immutable",
        ));
    }
    Ok(())
}

fn check_service_update(request: &WriteRequest<'_>, before: &Document) -> RuleCheck {
    check_update_frame(request, before)?;
    unchanged(before, request.after, fields::UID)?;

    let old = Counters::read(before)?;
    let new = Counters::read(request.after)?;
    if new.counter != old.counter {
        return Err(DenyReason::InvalidTransition(
            "service updates keep currentUploadIntentNumber",
        ));
    }

    if new.value > old.value {
        // credit
        unchanged(before, request.after, fields::UPLOAD_INTENT_IDS)
    } else if new.value == old.value {
        check_settle(before, request.after)
    } else {
        Err(DenyReason::InvalidTransition(
            "service updates never decrease value",
        ))
    }
}

/// Exactly one pending entry becomes settled; the key set is unchanged
fn check_settle(before: &Document, after: &Document) -> RuleCheck {
    let old_ids = map_field(before, fields::UPLOAD_INTENT_IDS)?;
    let new_ids = map_field(after, fields::UPLOAD_INTENT_IDS)?;

    if old_ids.len() != new_ids.len() || old_ids.keys().any(|k| !new_ids.contains_key(k)) {
        return Err(DenyReason::InvalidTransition(
            "settlement keeps the upload intent key set",
        ));
    }

    let mut flipped = 0;
    for (key, old_value) in old_ids {
        let new_value = &new_ids[key];
        if old_value == new_value {
            continue;
        }
        let old_flag = bool_entry(old_value)?;
        let new_flag = bool_entry(new_value)?;
        if old_flag || !new_flag {
            return Err(DenyReason::InvalidTransition(
                "settled upload intents never revert",
            ));
        }
        flipped += 1;
    }

    if flipped == 1 {
        Ok(())
    } else {
        Err(DenyReason::InvalidTransition(
            "settlement flips exactly one upload intent",
        ))
    }
}

fn bool_entry(value: &FieldValue) -> Result<bool, DenyReason> {
    value.as_bool().ok_or_else(|| DenyReason::FieldType {
        field: fields::UPLOAD_INTENT_IDS.to_string(),
    })
}


