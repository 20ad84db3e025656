//! Ledger CLI Entry Point
//!
//! Configuration is loaded from environment variables (via .env file).
//! Command-line arguments override environment variables.
//!
//! Usage:
//!   ledger start                  - Start the ledger API server
//!   ledger health                 - Check health of the ledger service
//!   ledger create-payment-intent  - Create a payment-intent
//!   ledger confirm-payment        - Credit a payment-intent to the balance
//!   ledger upload                 - Upload the file of a debited upload intent
//!   ledger get-document           - Read a document as the caller
//!   ledger token                  - Issue a development bearer token

use clap::Parser;
use ledger_cli::{handler, Cli, Commands};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // The server installs its own subscriber
    if cli.verbose && !matches!(cli.command, Commands::Start { .. }) {
        init_logging();
    }

    if let Err(e) = handler::run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}

fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ledger_cli=debug,reqwest=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
