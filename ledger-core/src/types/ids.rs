//! Collections, document paths and identifiers

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{LedgerError, LedgerResult};

/// Document collections
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Collection {
    /// Per-user balance, keyed by uid
    BalanceDocs,
    /// Per payment-intent record, keyed by provider id
    PaymentIntentDocs,
    /// Per debit record, keyed by `{uid}_{n}`
    UploadIntentDocs,
}

impl Collection {
    pub const ALL: [Collection; 3] = [
        Collection::BalanceDocs,
        Collection::PaymentIntentDocs,
        Collection::UploadIntentDocs,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::BalanceDocs => "balanceDocs",
            Collection::PaymentIntentDocs => "paymentIntentDocs",
            Collection::UploadIntentDocs => "uploadIntentDocs",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Collection {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Collection::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| LedgerError::UnknownCollection {
                name: s.to_string(),
            })
    }
}

/// Location of a document: collection plus key
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DocPath {
    pub collection: Collection,
    pub key: String,
}

impl DocPath {
    pub fn new(collection: Collection, key: impl Into<String>) -> Self {
        Self {
            collection,
            key: key.into(),
        }
    }

    pub fn balance(uid: &Uid) -> Self {
        Self::new(Collection::BalanceDocs, uid.as_str())
    }

    pub fn payment_intent(id: &PaymentIntentId) -> Self {
        Self::new(Collection::PaymentIntentDocs, id.as_str())
    }

    pub fn upload_intent(id: &UploadIntentId) -> Self {
        Self::new(Collection::UploadIntentDocs, id.as_str())
    }

    /// Parse `collection/key`
    pub fn parse(path: &str) -> LedgerResult<Self> {
        let (collection, key) = path.split_once('/').ok_or_else(|| LedgerError::InvalidPath {
            path: path.to_string(),
        })?;
        if key.is_empty() || key.contains('/') {
            return Err(LedgerError::InvalidPath {
                path: path.to_string(),
            });
        }
        Ok(Self::new(collection.parse()?, key))
    }
}

impl fmt::Display for DocPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.key)
    }
}

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Build a non-empty identifier
            pub fn new(id: impl Into<String>) -> LedgerResult<Self> {
                let id = id.into();
                if id.is_empty() {
                    return Err(LedgerError::EmptyId {
                        kind: $kind.to_string(),
                    });
                }
                Ok(Self(id))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = LedgerError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(
    /// Authenticated user id; also the balance document key
    Uid,
    "uid"
);
string_id!(
    /// Payment provider payment-intent id
    PaymentIntentId,
    "paymentIntentId"
);
string_id!(
    /// Upload intent id, `{uid}_{n}`
    UploadIntentId,
    "uploadIntentId"
);

impl UploadIntentId {
    /// Id of the `n`th upload intent of `uid`
    pub fn for_counter(uid: &Uid, n: i64) -> Self {
        Self(format!("{}_{}", uid, n))
    }
}

/// Identity a request is evaluated as
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Principal {
    /// End user authenticated by the identity provider
    User(Uid),
    /// Trusted server-side identity used by the orchestrator.
    /// Never derived from request input.
    Service,
}

impl Principal {
    pub fn user(uid: Uid) -> Self {
        Principal::User(uid)
    }

    pub fn uid(&self) -> Option<&Uid> {
        match self {
            Principal::User(uid) => Some(uid),
            Principal::Service => None,
        }
    }

    pub fn is_service(&self) -> bool {
        matches!(self, Principal::Service)
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Principal::User(uid) => write!(f, "user:{}", uid),
            Principal::Service => f.write_str("service"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_names() {
        for collection in Collection::ALL {
            assert_eq!(collection.as_str().parse::<Collection>().unwrap(), collection);
        }
        assert!(matches!(
            "users".parse::<Collection>(),
            Err(LedgerError::UnknownCollection { .. })
        ));
    }

    #[test]
    fn test_doc_path_parse_and_display() {
        let path = DocPath::parse("balanceDocs/uid123").unwrap();
        assert_eq!(path.collection, Collection::BalanceDocs);
        assert_eq!(path.key, "uid123");
        assert_eq!(path.to_string(), "balanceDocs/uid123");

        assert!(DocPath::parse("balanceDocs").is_err());
        assert!(DocPath::parse("balanceDocs/").is_err());
        assert!(DocPath::parse("balanceDocs/a/b").is_err());
        assert!(DocPath::parse("nope/a").is_err());
    }

    #[test]
    fn test_upload_intent_id_for_counter() {
        let uid = Uid::new("uid124").unwrap();
        assert_eq!(UploadIntentId::for_counter(&uid, 2).as_str(), "uid124_2");
    }

    #[test]
    fn test_ids_reject_empty() {
        assert!(matches!(Uid::new(""), Err(LedgerError::EmptyId { .. })));
        assert!(PaymentIntentId::new("pi_1").is_ok());
    }

    #[test]
    fn test_principal() {
        let user = Principal::user(Uid::new("uid123").unwrap());
        assert_eq!(user.uid().map(Uid::as_str), Some("uid123"));
        assert!(!user.is_service());
        assert!(Principal::Service.uid().is_none());
        assert_eq!(Principal::Service.to_string(), "service");
    }
}
