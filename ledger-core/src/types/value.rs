//! Document field values
//!
//! Mirrors the store's value model: numbers are either integers or doubles,
//! timestamps are a distinct type (a `{seconds, nanoseconds}` map is *not* a
//! timestamp), and `ServerTimestamp` is a write-time sentinel resolved by the
//! store at commit time.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::timestamp::Timestamp;

/// Raw document: field name to value
pub type Document = BTreeMap<String, FieldValue>;

/// A single field value
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldValue {
    Null,
    Boolean(bool),
    Integer(i64),
    Double(f64),
    String(String),
    Timestamp(Timestamp),
    Map(BTreeMap<String, FieldValue>),
    /// Replaced by the commit time when the write is applied
    ServerTimestamp,
}

impl FieldValue {
    /// Type name used in schema errors and deny reasons
    pub fn kind_name(&self) -> &'static str {
        match self {
            FieldValue::Null => "null",
            FieldValue::Boolean(_) => "boolean",
            FieldValue::Integer(_) => "integer",
            FieldValue::Double(_) => "double",
            FieldValue::String(_) => "string",
            FieldValue::Timestamp(_) => "timestamp",
            FieldValue::Map(_) => "map",
            FieldValue::ServerTimestamp => "serverTimestamp",
        }
    }

    pub fn is_number(&self) -> bool {
        matches!(self, FieldValue::Integer(_) | FieldValue::Double(_))
    }

    /// Integer view of a number; doubles qualify only when integral
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(v) => Some(*v),
            FieldValue::Double(v)
                if v.fract() == 0.0 && *v >= i64::MIN as f64 && *v < i64::MAX as f64 =>
            {
                Some(*v as i64)
            }
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<Timestamp> {
        match self {
            FieldValue::Timestamp(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, FieldValue>> {
        match self {
            FieldValue::Map(v) => Some(v),
            _ => None,
        }
    }

    /// Replace every nested `ServerTimestamp` with `at`
    pub fn resolve_server_timestamps(&mut self, at: Timestamp) {
        match self {
            FieldValue::ServerTimestamp => *self = FieldValue::Timestamp(at),
            FieldValue::Map(map) => {
                for value in map.values_mut() {
                    value.resolve_server_timestamps(at);
                }
            }
            _ => {}
        }
    }
}

/// Resolve all server timestamp sentinels in a document
pub fn resolve_server_timestamps(doc: &mut Document, at: Timestamp) {
    for value in doc.values_mut() {
        value.resolve_server_timestamps(at);
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Boolean(v)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Integer(v)
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Double(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::String(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::String(v)
    }
}

impl From<Timestamp> for FieldValue {
    fn from(v: Timestamp) -> Self {
        FieldValue::Timestamp(v)
    }
}

impl From<BTreeMap<String, FieldValue>> for FieldValue {
    fn from(v: BTreeMap<String, FieldValue>) -> Self {
        FieldValue::Map(v)
    }
}

impl From<BTreeMap<String, bool>> for FieldValue {
    fn from(v: BTreeMap<String, bool>) -> Self {
        FieldValue::Map(v.into_iter().map(|(k, b)| (k, FieldValue::Boolean(b))).collect())
    }
}


