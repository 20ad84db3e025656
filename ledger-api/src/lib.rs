//! Ledger API - HTTP Interface and Balance Orchestration
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │                 Ledger API                    │
//! │   /payment-intents   /payments/confirm        │
//! │   /documents/:c/:k   /uploads/:id   /health   │
//! │        │                    │                 │
//! │        ▼                    ▼                 │
//! │  document channel    BalanceOrchestrator      │
//! │  (caller's rules)    (service principal)      │
//! └───────────────────────────────────────────────┘
//!          │                    │           │
//!          ▼                    ▼           ▼
//!     ledger-store         ledger-store  ledger-bridge
//! ```
//!
//! # Endpoints
//!
//! - `GET /health` - Service health check
//! - `POST /payment-intents` - Create a provider payment-intent and record it
//! - `POST /payments/confirm` - Credit the caller's balance with a payment
//! - `GET /documents/:collection/:key` - Read a document as the caller
//! - `PUT /documents/:collection/:key` - Write a document as the caller
//! - `PUT /uploads/:upload_intent_id` - Upload the file of a debited intent
//!
//! # Usage Example
//!
//! ```ignore
//! use ledger_api::{build_app, AppState, LedgerConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = LedgerConfig::from_env().unwrap();
//!     let addr = config.listen_addr.clone();
//!     let app = build_app(AppState::from_config(config).unwrap());
//!
//!     let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
//!     axum::serve(listener, app).await.unwrap();
//! }
//! ```

pub mod auth;
pub mod config;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod locks;
pub mod metrics;
pub mod orchestrator;
pub mod routes;
pub mod state;
pub mod telemetry;

pub use auth::{AuthClaims, AuthUser, JwtConfig, MaybeAuthUser, DEFAULT_TOKEN_TTL_SECS};
pub use config::{ConfigError, Environment, LedgerConfig};
pub use error::{ApiError, ApiResult, ErrorResponse};
pub use locks::KeyedLocks;
pub use metrics::{init_metrics, MetricsConfig};
pub use orchestrator::{
    BalanceOrchestrator, CommitStrategy, ConfirmError, ConfirmOutcome, ConfirmResult,
    Confirmation, OrchestratorConfig, UploadReceipt,
};
pub use routes::{build_app, create_router};
pub use state::AppState;
pub use telemetry::{init_logging, LogConfig, LogFormat, LogLevel};
