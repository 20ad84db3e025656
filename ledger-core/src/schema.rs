//! Static document schemas
//!
//! One schema per collection. The rule engine uses them for shape closure
//! and type predicates; typed-record coercion uses them before reading
//! fields, so both layers agree on what a valid document is.

use crate::error::{LedgerError, LedgerResult};
use crate::types::{Collection, Document, FieldValue};

/// Field names shared across collections
pub mod fields {
    pub const ID: &str = "id";
    pub const UID: &str = "uid";
    pub const VALUE: &str = "value";
    pub const CURRENT_UPLOAD_INTENT_NUMBER: &str = "currentUploadIntentNumber";
    pub const UPLOAD_INTENT_IDS: &str = "uploadIntentIds";
    pub const IS_ACCOUNT_DEBITTED: &str = "isAccountDebitted";
    pub const CREATED_AT: &str = "createdAt";
    pub const UPDATED_AT: &str = "updatedAt";
}

/// Declared type of a field
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
    String,
    /// Integer or double
    Number,
    Boolean,
    Timestamp,
    /// Map whose values are all booleans
    BoolMap,
}

impl FieldKind {
    pub fn name(&self) -> &'static str {
        match self {
            FieldKind::String => "string",
            FieldKind::Number => "number",
            FieldKind::Boolean => "boolean",
            FieldKind::Timestamp => "timestamp",
            FieldKind::BoolMap => "map<string, boolean>",
        }
    }

    pub fn matches(&self, value: &FieldValue) -> bool {
        match self {
            FieldKind::String => matches!(value, FieldValue::String(_)),
            FieldKind::Number => value.is_number(),
            FieldKind::Boolean => matches!(value, FieldValue::Boolean(_)),
            FieldKind::Timestamp => matches!(value, FieldValue::Timestamp(_)),
            FieldKind::BoolMap => value
                .as_map()
                .map(|m| m.values().all(|v| matches!(v, FieldValue::Boolean(_))))
                .unwrap_or(false),
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
}

const fn field(name: &'static str, kind: FieldKind) -> FieldSpec {
    FieldSpec { name, kind }
}

/// Closed field set of one collection
#[derive(Clone, Copy, Debug)]
pub struct DocSchema {
    pub collection: Collection,
    pub fields: &'static [FieldSpec],
}

impl DocSchema {
    pub fn for_collection(collection: Collection) -> &'static DocSchema {
        match collection {
            Collection::BalanceDocs => &BALANCE_DOC_SCHEMA,
            Collection::PaymentIntentDocs => &PAYMENT_INTENT_DOC_SCHEMA,
            Collection::UploadIntentDocs => &UPLOAD_INTENT_DOC_SCHEMA,
        }
    }

    pub fn field_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|f| f.name)
    }

    pub fn kind_of(&self, name: &str) -> Option<FieldKind> {
        self.fields.iter().find(|f| f.name == name).map(|f| f.kind)
    }

    /// Declared fields absent from `doc`
    pub fn missing_keys(&self, doc: &Document) -> Vec<&'static str> {
        self.field_names().filter(|name| !doc.contains_key(*name)).collect()
    }

    /// Keys of `doc` the schema does not declare
    pub fn unexpected_keys<'d>(&self, doc: &'d Document) -> Vec<&'d str> {
        doc.keys()
            .map(String::as_str)
            .filter(|key| self.kind_of(key).is_none())
            .collect()
    }

    /// Key set equals the declared field set exactly
    pub fn has_exact_keys(&self, doc: &Document) -> bool {
        doc.len() == self.fields.len() && self.field_names().all(|name| doc.contains_key(name))
    }

    /// Every declared field present in `doc` has its declared type
    pub fn check_types(&self, doc: &Document) -> LedgerResult<()> {
        for field in self.fields {
            if let Some(value) = doc.get(field.name) {
                if !field.kind.matches(value) {
                    return Err(LedgerError::FieldType {
                        field: field.name.to_string(),
                        expected: field.kind.name().to_string(),
                        actual: value.kind_name().to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Exact key set and types
    pub fn validate(&self, doc: &Document) -> LedgerResult<()> {
        if let Some(field) = self.missing_keys(doc).first() {
            return Err(LedgerError::MissingField {
                collection: self.collection.to_string(),
                field: field.to_string(),
            });
        }
        if let Some(field) = self.unexpected_keys(doc).first() {
            return Err(LedgerError::UnexpectedField {
                collection: self.collection.to_string(),
                field: field.to_string(),
            });
        }
        self.check_types(doc)
    }
}

pub static BALANCE_DOC_SCHEMA: DocSchema = DocSchema {
    collection: Collection::BalanceDocs,
    fields: &[
        field(fields::ID, FieldKind::String),
        field(fields::UID, FieldKind::String),
        field(fields::VALUE, FieldKind::Number),
        field(fields::CURRENT_UPLOAD_INTENT_NUMBER, FieldKind::Number),
        field(fields::UPLOAD_INTENT_IDS, FieldKind::BoolMap),
        field(fields::CREATED_AT, FieldKind::Timestamp),
        field(fields::UPDATED_AT, FieldKind::Timestamp),
    ],
};

pub static PAYMENT_INTENT_DOC_SCHEMA: DocSchema = DocSchema {
    collection: Collection::PaymentIntentDocs,
    fields: &[
        field(fields::ID, FieldKind::String),
        field(fields::UID, FieldKind::String),
        field(fields::IS_ACCOUNT_DEBITTED, FieldKind::Boolean),
        field(fields::CREATED_AT, FieldKind::Timestamp),
        field(fields::UPDATED_AT, FieldKind::Timestamp),
    ],
};

pub static UPLOAD_INTENT_DOC_SCHEMA: DocSchema = DocSchema {
    collection: Collection::UploadIntentDocs,
    fields: &[
        field(fields::ID, FieldKind::String),
        field(fields::UID, FieldKind::String),
        field(fields::CREATED_AT, FieldKind::Timestamp),
        field(fields::UPDATED_AT, FieldKind::Timestamp),
    ],
};

/// Balance fields an update may change
pub const BALANCE_UPDATABLE_KEYS: [&str; 4] = [
    fields::VALUE,
    fields::CURRENT_UPLOAD_INTENT_NUMBER,
    fields::UPLOAD_INTENT_IDS,
    fields::UPDATED_AT,
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Timestamp;

    fn upload_intent_doc() -> Document {
        let now = Timestamp::now();
        let mut doc = Document::new();
        doc.insert("id".into(), "uid124_2".into());
        doc.insert("uid".into(), "uid124".into());
        doc.insert("createdAt".into(), now.into());
        doc.insert("updatedAt".into(), now.into());
        doc
    }

    #[test]
    fn test_exact_keys() {
        let doc = upload_intent_doc();
        assert!(UPLOAD_INTENT_DOC_SCHEMA.has_exact_keys(&doc));
        assert!(UPLOAD_INTENT_DOC_SCHEMA.validate(&doc).is_ok());

        let mut missing = doc.clone();
        missing.remove("uid");
        assert!(!UPLOAD_INTENT_DOC_SCHEMA.has_exact_keys(&missing));
        assert_eq!(UPLOAD_INTENT_DOC_SCHEMA.missing_keys(&missing), vec!["uid"]);
        assert!(matches!(
            UPLOAD_INTENT_DOC_SCHEMA.validate(&missing),
            Err(LedgerError::MissingField { .. })
        ));

        let mut extra = doc;
        extra.insert("someOtherKey".into(), "x".into());
        assert!(!UPLOAD_INTENT_DOC_SCHEMA.has_exact_keys(&extra));
        assert_eq!(UPLOAD_INTENT_DOC_SCHEMA.unexpected_keys(&extra), vec!["someOtherKey"]);
        assert!(matches!(
            UPLOAD_INTENT_DOC_SCHEMA.validate(&extra),
            Err(LedgerError::UnexpectedField { .. })
        ));
    }

    #[test]
    fn test_type_confusion() {
        let mut doc = upload_intent_doc();
        doc.insert("uid".into(), FieldValue::Integer(124));
        let err = UPLOAD_INTENT_DOC_SCHEMA.validate(&doc).unwrap_err();
        assert!(err.is_schema_error());
        assert!(matches!(err, LedgerError::FieldType { ref field, .. } if field == "uid"));
    }

    #[test]
    fn test_bool_map_kind() {
        let mut map = std::collections::BTreeMap::new();
        map.insert("uid124_1".to_string(), FieldValue::Boolean(true));
        assert!(FieldKind::BoolMap.matches(&FieldValue::Map(map.clone())));

        map.insert("uid124_2".to_string(), FieldValue::String("false".into()));
        assert!(!FieldKind::BoolMap.matches(&FieldValue::Map(map)));
        assert!(!FieldKind::BoolMap.matches(&FieldValue::Boolean(false)));
    }

    #[test]
    fn test_number_accepts_integer_and_double() {
        assert!(FieldKind::Number.matches(&FieldValue::Integer(1)));
        assert!(FieldKind::Number.matches(&FieldValue::Double(1.5)));
        assert!(!FieldKind::Number.matches(&"1".into()));
    }
}
