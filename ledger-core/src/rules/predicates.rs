//! Field-level predicates shared by the collection rules

use std::collections::BTreeMap;

use super::{DenyReason, RuleCheck};
use crate::schema::{fields, DocSchema};
use crate::types::{DocPath, Document, FieldValue, Timestamp, Uid};

/// Key set equals the schema's field set, and every field has its type
pub fn shape(schema: &DocSchema, doc: &Document) -> RuleCheck {
    if !schema.has_exact_keys(doc) {
        return Err(DenyReason::Shape {
            missing: schema.missing_keys(doc).into_iter().map(String::from).collect(),
            unexpected: schema
                .unexpected_keys(doc)
                .into_iter()
                .map(String::from)
                .collect(),
        });
    }
    schema.check_types(doc).map_err(|err| match err {
        crate::error::LedgerError::FieldType { field, .. } => DenyReason::FieldType { field },
        other => DenyReason::FieldType {
            field: other.to_string(),
        },
    })
}

pub fn string_field<'d>(doc: &'d Document, field: &str) -> Result<&'d str, DenyReason> {
    doc.get(field)
        .and_then(FieldValue::as_str)
        .ok_or_else(|| DenyReason::FieldType {
            field: field.to_string(),
        })
}

/// Integer-valued number; fractional doubles are denied
pub fn integer_field(doc: &Document, field: &str) -> Result<i64, DenyReason> {
    doc.get(field)
        .and_then(FieldValue::as_i64)
        .ok_or_else(|| DenyReason::FieldType {
            field: field.to_string(),
        })
}

pub fn bool_field(doc: &Document, field: &str) -> Result<bool, DenyReason> {
    doc.get(field)
        .and_then(FieldValue::as_bool)
        .ok_or_else(|| DenyReason::FieldType {
            field: field.to_string(),
        })
}

pub fn map_field<'d>(
    doc: &'d Document,
    field: &str,
) -> Result<&'d BTreeMap<String, FieldValue>, DenyReason> {
    doc.get(field)
        .and_then(FieldValue::as_map)
        .ok_or_else(|| DenyReason::FieldType {
            field: field.to_string(),
        })
}

/// `doc.id` equals the document key
pub fn id_is_key(doc: &Document, path: &DocPath) -> RuleCheck {
    if string_field(doc, fields::ID)? == path.key {
        Ok(())
    } else {
        Err(DenyReason::IdMismatch)
    }
}

/// `doc.uid` equals the caller
pub fn owned_by(doc: &Document, uid: &Uid) -> RuleCheck {
    if string_field(doc, fields::UID)? == uid.as_str() {
        Ok(())
    } else {
        Err(DenyReason::OwnerMismatch)
    }
}

/// Field holds exactly the request time
pub fn is_request_time(doc: &Document, field: &str, request_time: Timestamp) -> RuleCheck {
    match doc.get(field).and_then(FieldValue::as_timestamp) {
        Some(ts) if ts == request_time => Ok(()),
        _ => Err(DenyReason::NotRequestTime {
            field: field.to_string(),
        }),
    }
}

/// Field is identical before and after
pub fn unchanged(before: &Document, after: &Document, field: &str) -> RuleCheck {
    if before.get(field) == after.get(field) {
        Ok(())
    } else {
        Err(DenyReason::Immutable {
            field: field.to_string(),
        })
    }
}

/// Every field outside `mutable` is identical before and after
pub fn only_changes(before: &Document, after: &Document, mutable: &[&str]) -> RuleCheck {
    before
        .keys()
        .chain(after.keys())
        .filter(|key| !mutable.contains(&key.as_str()))
        .try_for_each(|key| unchanged(before, after, key))
}


