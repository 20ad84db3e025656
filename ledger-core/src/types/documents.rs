//! Typed ledger documents
//!
//! Each record is coerced from a raw [`Document`] through its collection
//! schema, so a malformed document yields a typed error instead of a panic.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::ids::{PaymentIntentId, Uid, UploadIntentId};
use super::timestamp::Timestamp;
use super::value::{Document, FieldValue};
use crate::error::{LedgerError, LedgerResult};
use crate::schema::{
    fields, DocSchema, BALANCE_DOC_SCHEMA, PAYMENT_INTENT_DOC_SCHEMA, UPLOAD_INTENT_DOC_SCHEMA,
};

/// Fixed debit per upload intent, in minor currency units
pub const UPLOAD_INTENT_COST: i64 = 300;

/// Set `createdAt` and `updatedAt` to the server timestamp sentinel
pub fn creatify(mut doc: Document) -> Document {
    doc.insert(fields::CREATED_AT.to_string(), FieldValue::ServerTimestamp);
    doc.insert(fields::UPDATED_AT.to_string(), FieldValue::ServerTimestamp);
    doc
}

/// Set `updatedAt` to the server timestamp sentinel
pub fn updatify(mut doc: Document) -> Document {
    doc.insert(fields::UPDATED_AT.to_string(), FieldValue::ServerTimestamp);
    doc
}

// ============================================================
// Field readers (schema already validated)
// ============================================================

fn read_string(doc: &Document, field: &str) -> LedgerResult<String> {
    doc.get(field)
        .and_then(FieldValue::as_str)
        .map(str::to_string)
        .ok_or_else(|| type_error(doc, field, "string"))
}

fn read_integer(doc: &Document, field: &str) -> LedgerResult<i64> {
    doc.get(field)
        .and_then(FieldValue::as_i64)
        .ok_or_else(|| LedgerError::NonIntegerNumber {
            field: field.to_string(),
        })
}

fn read_bool(doc: &Document, field: &str) -> LedgerResult<bool> {
    doc.get(field)
        .and_then(FieldValue::as_bool)
        .ok_or_else(|| type_error(doc, field, "boolean"))
}

fn read_timestamp(doc: &Document, field: &str) -> LedgerResult<Timestamp> {
    doc.get(field)
        .and_then(FieldValue::as_timestamp)
        .ok_or_else(|| type_error(doc, field, "timestamp"))
}

fn read_bool_map(doc: &Document, field: &str) -> LedgerResult<BTreeMap<String, bool>> {
    let map = doc
        .get(field)
        .and_then(FieldValue::as_map)
        .ok_or_else(|| type_error(doc, field, "map<string, boolean>"))?;
    map.iter()
        .map(|(k, v)| {
            v.as_bool()
                .map(|b| (k.clone(), b))
                .ok_or_else(|| type_error(doc, field, "map<string, boolean>"))
        })
        .collect()
}

fn type_error(doc: &Document, field: &str, expected: &str) -> LedgerError {
    LedgerError::FieldType {
        field: field.to_string(),
        expected: expected.to_string(),
        actual: doc
            .get(field)
            .map(FieldValue::kind_name)
            .unwrap_or("missing")
            .to_string(),
    }
}

fn coerce(schema: &DocSchema, doc: &Document) -> LedgerResult<()> {
    schema.validate(doc)
}

// ============================================================
// BalanceDoc
// ============================================================

/// Per-user balance document, keyed by uid
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceDoc {
    pub id: String,
    pub uid: Uid,
    pub value: i64,
    pub current_upload_intent_number: i64,
    pub upload_intent_ids: BTreeMap<String, bool>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl BalanceDoc {
    /// Fresh balance for `uid`, stamped at `at`
    pub fn initial(uid: &Uid, at: Timestamp) -> Self {
        Self {
            id: uid.to_string(),
            uid: uid.clone(),
            value: 0,
            current_upload_intent_number: 0,
            upload_intent_ids: BTreeMap::new(),
            created_at: at,
            updated_at: at,
        }
    }

    /// Id the next debit records
    pub fn next_upload_intent_id(&self) -> UploadIntentId {
        UploadIntentId::for_counter(&self.uid, self.current_upload_intent_number + 1)
    }

    /// The debit transition: value down by the cost, counter up by one,
    /// one new pending entry
    pub fn debited(&self) -> Self {
        let mut next = self.clone();
        let id = self.next_upload_intent_id();
        next.value = self.value - UPLOAD_INTENT_COST;
        next.current_upload_intent_number = self.current_upload_intent_number + 1;
        next.upload_intent_ids.insert(id.into_inner(), false);
        next
    }

    /// The credit transition: value up by `amount`, nothing else
    pub fn credited(&self, amount: i64) -> LedgerResult<Self> {
        if amount <= 0 {
            return Err(LedgerError::NonPositiveCredit { amount });
        }
        let value = self
            .value
            .checked_add(amount)
            .ok_or(LedgerError::BalanceOverflow {
                value: self.value,
                amount,
            })?;
        Ok(Self {
            value,
            ..self.clone()
        })
    }

    /// The settle transition: one pending entry flips to settled
    pub fn settled(&self, id: &UploadIntentId) -> LedgerResult<Self> {
        match self.upload_intent_ids.get(id.as_str()) {
            Some(false) => {
                let mut next = self.clone();
                next.upload_intent_ids.insert(id.to_string(), true);
                Ok(next)
            }
            _ => Err(LedgerError::UploadIntentNotPending { id: id.to_string() }),
        }
    }

    pub fn is_pending(&self, id: &UploadIntentId) -> bool {
        self.upload_intent_ids.get(id.as_str()) == Some(&false)
    }

    pub fn to_document(&self) -> Document {
        let mut doc = Document::new();
        doc.insert(fields::ID.into(), self.id.clone().into());
        doc.insert(fields::UID.into(), self.uid.to_string().into());
        doc.insert(fields::VALUE.into(), self.value.into());
        doc.insert(
            fields::CURRENT_UPLOAD_INTENT_NUMBER.into(),
            self.current_upload_intent_number.into(),
        );
        doc.insert(
            fields::UPLOAD_INTENT_IDS.into(),
            self.upload_intent_ids.clone().into(),
        );
        doc.insert(fields::CREATED_AT.into(), self.created_at.into());
        doc.insert(fields::UPDATED_AT.into(), self.updated_at.into());
        doc
    }
}

impl TryFrom<&Document> for BalanceDoc {
    type Error = LedgerError;

    fn try_from(doc: &Document) -> LedgerResult<Self> {
        coerce(&BALANCE_DOC_SCHEMA, doc)?;
        Ok(Self {
            id: read_string(doc, fields::ID)?,
            uid: Uid::new(read_string(doc, fields::UID)?)?,
            value: read_integer(doc, fields::VALUE)?,
            current_upload_intent_number: read_integer(doc, fields::CURRENT_UPLOAD_INTENT_NUMBER)?,
            upload_intent_ids: read_bool_map(doc, fields::UPLOAD_INTENT_IDS)?,
            created_at: read_timestamp(doc, fields::CREATED_AT)?,
            updated_at: read_timestamp(doc, fields::UPDATED_AT)?,
        })
    }
}

// ============================================================
// PaymentIntentDoc
// ============================================================

/// Local record of a provider payment-intent
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntentDoc {
    pub id: PaymentIntentId,
    pub uid: Uid,
    pub is_account_debitted: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl PaymentIntentDoc {
    pub fn new(id: &PaymentIntentId, uid: &Uid, at: Timestamp) -> Self {
        Self {
            id: id.clone(),
            uid: uid.clone(),
            is_account_debitted: false,
            created_at: at,
            updated_at: at,
        }
    }

    /// Marked as applied to the balance
    pub fn debitted(&self) -> Self {
        Self {
            is_account_debitted: true,
            ..self.clone()
        }
    }

    pub fn to_document(&self) -> Document {
        let mut doc = Document::new();
        doc.insert(fields::ID.into(), self.id.to_string().into());
        doc.insert(fields::UID.into(), self.uid.to_string().into());
        doc.insert(
            fields::IS_ACCOUNT_DEBITTED.into(),
            self.is_account_debitted.into(),
        );
        doc.insert(fields::CREATED_AT.into(), self.created_at.into());
        doc.insert(fields::UPDATED_AT.into(), self.updated_at.into());
        doc
    }
}

impl TryFrom<&Document> for PaymentIntentDoc {
    type Error = LedgerError;

    fn try_from(doc: &Document) -> LedgerResult<Self> {
        coerce(&PAYMENT_INTENT_DOC_SCHEMA, doc)?;
        Ok(Self {
            id: PaymentIntentId::new(read_string(doc, fields::ID)?)?,
            uid: Uid::new(read_string(doc, fields::UID)?)?,
            is_account_debitted: read_bool(doc, fields::IS_ACCOUNT_DEBITTED)?,
            created_at: read_timestamp(doc, fields::CREATED_AT)?,
            updated_at: read_timestamp(doc, fields::UPDATED_AT)?,
        })
    }
}

// ============================================================
// UploadIntentDoc
// ============================================================

/// One debit event, keyed by `{uid}_{n}`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadIntentDoc {
    pub id: UploadIntentId,
    pub uid: Uid,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl UploadIntentDoc {
    pub fn new(id: &UploadIntentId, uid: &Uid, at: Timestamp) -> Self {
        Self {
            id: id.clone(),
            uid: uid.clone(),
            created_at: at,
            updated_at: at,
        }
    }

    pub fn to_document(&self) -> Document {
        let mut doc = Document::new();
        doc.insert(fields::ID.into(), self.id.to_string().into());
        doc.insert(fields::UID.into(), self.uid.to_string().into());
        doc.insert(fields::CREATED_AT.into(), self.created_at.into());
        doc.insert(fields::UPDATED_AT.into(), self.updated_at.into());
        doc
    }
}

impl TryFrom<&Document> for UploadIntentDoc {
    type Error = LedgerError;

    fn try_from(doc: &Document) -> LedgerResult<Self> {
        coerce(&UPLOAD_INTENT_DOC_SCHEMA, doc)?;
        Ok(Self {
            id: UploadIntentId::new(read_string(doc, fields::ID)?)?,
            uid: Uid::new(read_string(doc, fields::UID)?)?,
            created_at: read_timestamp(doc, fields::CREATED_AT)?,
            updated_at: read_timestamp(doc, fields::UPDATED_AT)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uid(s: &str) -> Uid {
        Uid::new(s).unwrap()
    }

    fn funded(uid_str: &str, value: i64) -> BalanceDoc {
        let at = Timestamp::from_parts(1_700_000_000, 0).unwrap();
        let mut doc = BalanceDoc::initial(&uid(uid_str), at);
        doc.value = value;
        doc.current_upload_intent_number = 1;
        doc.upload_intent_ids.insert(format!("{}_1", uid_str), true);
        doc
    }

    #[test]
    fn test_document_conversion() {
        let balance = funded("uid124", 1000);
        let doc = balance.to_document();
        assert!(BALANCE_DOC_SCHEMA.has_exact_keys(&doc));
        assert_eq!(BalanceDoc::try_from(&doc).unwrap(), balance);

        let pi = PaymentIntentDoc::new(
            &PaymentIntentId::new("pi_1").unwrap(),
            &uid("uid123"),
            Timestamp::now(),
        );
        assert_eq!(PaymentIntentDoc::try_from(&pi.to_document()).unwrap(), pi);
    }

    #[test]
    fn test_coercion_fails_without_panicking() {
        let mut doc = funded("uid124", 1000).to_document();
        doc.insert(fields::VALUE.into(), "1000".into());
        let err = BalanceDoc::try_from(&doc).unwrap_err();
        assert!(err.is_schema_error());

        let mut doc = funded("uid124", 1000).to_document();
        doc.insert(fields::VALUE.into(), FieldValue::Double(10.5));
        assert!(matches!(
            BalanceDoc::try_from(&doc),
            Err(LedgerError::NonIntegerNumber { .. })
        ));

        let mut doc = funded("uid124", 1000).to_document();
        doc.remove(fields::CREATED_AT);
        assert!(matches!(
            BalanceDoc::try_from(&doc),
            Err(LedgerError::MissingField { .. })
        ));
    }

    #[test]
    fn test_debit_transition() {
        let before = funded("uid124", 1000);
        let after = before.debited();
        assert_eq!(after.value, 700);
        assert_eq!(after.current_upload_intent_number, 2);
        assert_eq!(after.upload_intent_ids.get("uid124_1"), Some(&true));
        assert_eq!(after.upload_intent_ids.get("uid124_2"), Some(&false));
        assert!(after.is_pending(&UploadIntentId::for_counter(&before.uid, 2)));
    }

    #[test]
    fn test_credit_transition() {
        let before = funded("uid124", 1000);
        let after = before.credited(250).unwrap();
        assert_eq!(after.value, 1250);
        assert_eq!(after.upload_intent_ids, before.upload_intent_ids);
        assert!(before.credited(0).is_err());
        assert!(matches!(
            funded("uid124", i64::MAX).credited(1),
            Err(LedgerError::BalanceOverflow { .. })
        ));
    }

    #[test]
    fn test_settle_transition() {
        let debited = funded("uid124", 1000).debited();
        let id = UploadIntentId::for_counter(&debited.uid, 2);
        let settled = debited.settled(&id).unwrap();
        assert_eq!(settled.upload_intent_ids.get("uid124_2"), Some(&true));
        assert!(matches!(
            settled.settled(&id),
            Err(LedgerError::UploadIntentNotPending { .. })
        ));
        assert!(debited
            .settled(&UploadIntentId::for_counter(&debited.uid, 9))
            .is_err());
    }

    #[test]
    fn test_creatify_and_updatify() {
        let doc = creatify(Document::new());
        assert_eq!(doc[fields::CREATED_AT], FieldValue::ServerTimestamp);
        assert_eq!(doc[fields::UPDATED_AT], FieldValue::ServerTimestamp);

        let mut existing = funded("uid124", 0).to_document();
        let created = existing[fields::CREATED_AT].clone();
        existing = updatify(existing);
        assert_eq!(existing[fields::CREATED_AT], created);
        assert_eq!(existing[fields::UPDATED_AT], FieldValue::ServerTimestamp);
    }
}
