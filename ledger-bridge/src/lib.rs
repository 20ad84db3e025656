//! Ledger Bridge - Payment Provider Clients
//!
//! Outbound clients for the payment provider the ledger credits from.
//!
//! # Components
//!
//! - [`PaymentProvider`]: create and retrieve payment-intents
//! - [`StripePaymentProvider`]: REST client (form bodies, bearer secret key)
//! - [`MockPaymentProvider`]: in-memory provider with forced statuses and
//!   an unavailable mode

pub mod error;
pub mod mock;
pub mod provider;
pub mod stripe;

pub use error::{BridgeError, BridgeResult};
pub use mock::MockPaymentProvider;
pub use provider::{PaymentIntent, PaymentProvider, STATUS_SUCCEEDED};
pub use stripe::{RetryConfig, StripePaymentProvider, DEFAULT_API_BASE};
