//! Ledger Repositories
//!
//! Typed access to the three ledger collections. Client operations go
//! through the store as the calling principal, so the rules still decide;
//! the `*_write` builders produce preconditioned writes for callers that
//! compose their own batches.

mod balance_repo;
mod payment_intent_repo;
mod upload_intent_repo;

pub use balance_repo::*;
pub use payment_intent_repo::*;
pub use upload_intent_repo::*;

use ledger_core::{Document, LedgerError};

use crate::document::StoredDocument;
use crate::error::StoreResult;

/// A typed document with the store version it was read at
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Versioned<T> {
    pub doc: T,
    pub version: u64,
}

fn decode<T>(stored: Option<StoredDocument>) -> StoreResult<Option<Versioned<T>>>
where
    T: for<'a> TryFrom<&'a Document, Error = LedgerError>,
{
    stored
        .map(|s| -> StoreResult<Versioned<T>> {
            Ok(Versioned {
                doc: T::try_from(&s.data)?,
                version: s.version,
            })
        })
        .transpose()
}
