//! Ledger Core - Documents, Schemas and Authorization Rules
//!
//! The ledger keeps three document kinds per user:
//! - **balanceDocs**: spendable value plus the upload intent counter and flags
//! - **paymentIntentDocs**: one record per provider payment-intent, applied once
//! - **uploadIntentDocs**: one record per fixed-cost debit
//!
//! Every write is checked by the rule engine in [`rules`]. The engine is a
//! set of pure functions over the caller, the stored state, the proposed
//! state and the request time, so every invariant can be tested directly.
//!
//! # Sanctioned balance transitions
//!
//! | Transition | Caller | value | currentUploadIntentNumber | uploadIntentIds |
//! |------------|--------|-------|---------------------------|-----------------|
//! | **create** | owner | `0` | `0` | `{}` |
//! | **debit** | owner | `-300`, stays `>= 0` | `+1` | one new `{uid}_{n}: false` |
//! | **credit** | service | `+amount` | unchanged | unchanged |
//! | **settle** | service | unchanged | unchanged | one entry `false -> true` |

pub mod error;
pub mod rules;
pub mod schema;
pub mod types;

pub use error::{LedgerError, LedgerResult};

pub use types::*;

pub use rules::{
    authorize_blob_upload, authorize_read, authorize_write, Decision, DenyReason, DocumentLookup,
    EmptyLookup, WriteRequest,
};

pub use schema::{DocSchema, FieldKind};
