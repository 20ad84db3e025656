//! CLI Commands
//!
//! Command definitions for the ledger CLI.

use clap::{Parser, Subcommand};

/// Upload ledger CLI
#[derive(Parser, Debug)]
#[command(name = "ledger")]
#[command(version)]
#[command(about = "Upload ledger command line interface")]
#[command(long_about = "Run the ledger API server, or credit payments and inspect \
    balance documents on a running one.")]
pub struct Cli {
    /// API endpoint URL
    #[arg(short, long, env = "LEDGER_API_URL", default_value = "http://localhost:3000")]
    pub api_url: String,

    /// Bearer token sent with requests (env: LEDGER_TOKEN)
    #[arg(short, long, env = "LEDGER_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Request timeout in seconds
    #[arg(long, default_value = "30")]
    pub timeout: u64,

    /// Output format (json, table, plain)
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// Table format (human-readable)
    #[default]
    Table,
    /// Plain text
    Plain,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the ledger API server
    Start {
        /// Address to bind to (env: LEDGER_LISTEN_ADDR)
        #[arg(short, long)]
        listen: Option<String>,
        /// Payment currency (env: LEDGER_CURRENCY)
        #[arg(long)]
        currency: Option<String>,
        /// Only credit succeeded payment-intents (env: LEDGER_REQUIRE_SUCCEEDED)
        #[arg(long)]
        require_succeeded: bool,
        /// Log as JSON lines instead of the environment default
        #[arg(long)]
        json_logs: bool,
    },

    /// Check health of the ledger service
    Health,

    /// Create a payment-intent for the caller
    CreatePaymentIntent {
        /// Amount in minor currency units
        #[arg(long)]
        amount: i64,
    },

    /// Credit a payment-intent to the caller's balance
    ConfirmPayment {
        /// Payment-intent id
        #[arg(long)]
        id: String,
    },

    /// Upload the file of a debited upload intent
    Upload {
        /// Upload-intent id (`<uid>_<n>`)
        #[arg(long)]
        id: String,
        /// File to upload
        #[arg(long)]
        file: std::path::PathBuf,
    },

    /// Read a document as the caller
    GetDocument {
        /// Collection (balanceDocs, paymentIntentDocs, uploadIntentDocs)
        collection: String,
        /// Document key
        key: String,
    },

    /// Issue a bearer token for a uid with the configured secret
    Token {
        #[arg(long)]
        uid: String,
        /// Token lifetime in seconds
        #[arg(long, default_value = "3600")]
        ttl: u64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_help() {
        let result = Cli::try_parse_from(["ledger", "--help"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_output_format_default() {
        assert_eq!(OutputFormat::default(), OutputFormat::Table);
    }

    #[test]
    fn test_parse_confirm_payment() {
        let cli = Cli::try_parse_from([
            "ledger",
            "--token",
            "abc",
            "-f",
            "json",
            "confirm-payment",
            "--id",
            "pi_1",
        ])
        .unwrap();
        assert_eq!(cli.token.as_deref(), Some("abc"));
        assert_eq!(cli.format, OutputFormat::Json);
        match cli.command {
            Commands::ConfirmPayment { id } => assert_eq!(id, "pi_1"),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_get_document() {
        let cli = Cli::try_parse_from(["ledger", "get-document", "balanceDocs", "uid123"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::GetDocument { ref collection, ref key }
                if collection == "balanceDocs" && key == "uid123"
        ));
    }

    #[test]
    fn test_amount_must_be_a_number() {
        assert!(Cli::try_parse_from(["ledger", "create-payment-intent", "--amount", "ten"]).is_err());
    }
}
