//! Ledger CLI
//!
//! Runs the ledger API server and talks to a running one.
//!
//! # Usage
//!
//! ```text
//! ledger [OPTIONS] <COMMAND>
//!
//! Commands:
//!   start                  Start the ledger API server
//!   health                 Check health of the ledger service
//!   create-payment-intent  Create a payment-intent for the caller
//!   confirm-payment        Credit a payment-intent to the caller's balance
//!   upload                 Upload the file of a debited upload intent
//!   get-document           Read a document as the caller
//!   token                  Issue a bearer token for a uid
//!
//! Options:
//!   -a, --api-url <URL>    API endpoint URL [default: http://localhost:3000]
//!   -t, --token <TOKEN>    Bearer token sent with requests
//!   -f, --format <FORMAT>  Output format (json, table, plain) [default: table]
//!   -v, --verbose          Enable verbose output
//! ```
//!
//! # Examples
//!
//! ```text
//! export LEDGER_TOKEN=$(ledger -f plain token --uid uid123)
//! ledger create-payment-intent --amount 500
//! ledger confirm-payment --id pi_3N...
//! ledger get-document balanceDocs uid123
//! ```

pub mod client;
pub mod commands;
pub mod error;
pub mod handler;
pub mod output;

pub use client::LedgerClient;
pub use commands::{Cli, Commands, OutputFormat};
pub use error::{CliError, CliResult};

/// Ledger CLI version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
