//! Command Handlers

use crate::client::LedgerClient;
use crate::commands::{Cli, Commands, OutputFormat};
use crate::error::{CliError, CliResult};
use crate::output;
use ledger_api::{
    build_app, init_logging, init_metrics, AppState, JwtConfig, LedgerConfig, LogConfig,
    LogFormat, LogLevel, MetricsConfig,
};
use ledger_core::Uid;
use serde_json::json;
use std::path::Path;

/// Overrides `ledger start` applies on top of the environment
#[derive(Debug, Default)]
pub struct StartOverrides {
    pub listen: Option<String>,
    pub currency: Option<String>,
    pub require_succeeded: bool,
}

impl StartOverrides {
    pub fn apply(self, mut config: LedgerConfig) -> CliResult<LedgerConfig> {
        if let Some(listen) = self.listen {
            config.listen_addr = listen;
        }
        if let Some(currency) = self.currency {
            config.currency = currency.trim().to_lowercase();
        }
        if self.require_succeeded {
            config.require_succeeded = true;
        }
        config.validate()?;
        Ok(config)
    }
}

/// Run the CLI with parsed arguments
pub async fn run(cli: Cli) -> CliResult<()> {
    let client = LedgerClient::with_timeout(&cli.api_url, cli.timeout)?.with_token(cli.token);
    let format = cli.format;

    match cli.command {
        Commands::Start {
            listen,
            currency,
            require_succeeded,
            json_logs,
        } => {
            let overrides = StartOverrides {
                listen,
                currency,
                require_succeeded,
            };
            handle_start(overrides, json_logs, cli.verbose).await
        }
        Commands::Token { uid, ttl } => handle_token(&uid, ttl, format),
        Commands::Health => {
            let health = client.health().await?;
            output::print_health(&health, format);
            Ok(())
        }
        Commands::CreatePaymentIntent { amount } => {
            if amount <= 0 {
                return Err(CliError::invalid_arg("amount must be greater than 0"));
            }
            let intent = client.create_payment_intent(amount).await?;
            output::print_payment_intent(&intent, format);
            Ok(())
        }
        Commands::ConfirmPayment { id } => handle_confirm(&client, &id, format).await,
        Commands::Upload { id, file } => handle_upload(&client, &id, &file, format).await,
        Commands::GetDocument { collection, key } => {
            let doc = client.get_document(&collection, &key).await?;
            output::print_document(&doc, format);
            Ok(())
        }
    }
}

/// Run the API server until it is stopped
async fn handle_start(overrides: StartOverrides, json_logs: bool, verbose: bool) -> CliResult<()> {
    let config = overrides.apply(LedgerConfig::from_env()?)?;

    let mut log_config = LogConfig::for_environment(config.environment);
    if json_logs {
        log_config = log_config.with_format(LogFormat::Json);
    }
    if verbose {
        log_config = log_config.with_level(LogLevel::Debug);
    }
    init_logging(&log_config).map_err(|e| CliError::config(format!("logging: {}", e)))?;
    init_metrics(&MetricsConfig::from_env()).map_err(CliError::server)?;

    let addr = config.listen_addr.clone();
    tracing::info!(
        environment = %config.environment,
        currency = %config.currency,
        mock_provider = config.uses_mock_provider(),
        "starting ledger API"
    );
    let state = AppState::from_config(config).map_err(|e| CliError::config(e.to_string()))?;
    let app = build_app(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| CliError::server(format!("bind {}: {}", addr, e)))?;
    tracing::info!(%addr, "ledger API listening");

    axum::serve(listener, app)
        .await
        .map_err(|e| CliError::server(format!("Server error: {}", e)))
}

async fn handle_confirm(client: &LedgerClient, id: &str, format: OutputFormat) -> CliResult<()> {
    let outcome = client.confirm_payment(id).await?;
    if format == OutputFormat::Json {
        output::print_json(&outcome);
    }
    if outcome.success {
        if format != OutputFormat::Json {
            output::print_success(&format!("payment {} credited", id));
        }
        return Ok(());
    }
    let message = outcome
        .error
        .map(|e| e.message)
        .unwrap_or_else(|| "unknown error".to_string());
    Err(CliError::not_credited(message))
}

async fn handle_upload(
    client: &LedgerClient,
    id: &str,
    file: &Path,
    format: OutputFormat,
) -> CliResult<()> {
    let data = tokio::fs::read(file).await?;
    tracing::debug!(file = %file.display(), bytes = data.len(), "uploading");
    let receipt = client.upload(id, data).await?;
    output::print_upload(&receipt, format);
    Ok(())
}

/// Sign a token with the configured secret
fn handle_token(uid: &str, ttl: u64, format: OutputFormat) -> CliResult<()> {
    let config = LedgerConfig::from_env()?;
    let token = issue_token(&config, uid, ttl)?;
    match format {
        OutputFormat::Json => output::print_json(&json!({ "uid": uid, "token": token })),
        OutputFormat::Table | OutputFormat::Plain => println!("{}", token),
    }
    Ok(())
}

fn issue_token(config: &LedgerConfig, uid: &str, ttl: u64) -> CliResult<String> {
    if config.environment.is_production() {
        return Err(CliError::config("token issuing is disabled in production"));
    }
    let uid = Uid::new(uid).map_err(|e| CliError::invalid_arg(e.to_string()))?;
    JwtConfig::new(config.jwt_secret.clone())
        .issue_token(&uid, ttl)
        .map_err(|e| CliError::config(e.to_string()))
}


