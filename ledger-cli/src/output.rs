//! Output Formatting

use crate::commands::OutputFormat;
use ledger_api::dto::{CreatePaymentIntentResponse, DocumentResponse, HealthResponse};
use ledger_api::UploadReceipt;
use serde::Serialize;

pub fn print_json<T: Serialize>(data: &T) {
    match serde_json::to_string_pretty(data) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error formatting JSON: {}", e),
    }
}

pub fn print_health(health: &HealthResponse, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(health),
        OutputFormat::Plain => println!("{}", health.status),
        OutputFormat::Table => {
            println!("Ledger Service Health");
            println!("=====================");
            print_row("Status", &health.status);
            print_row("Service", &health.service);
            print_row("Version", &health.version);
            print_row("Environment", &health.environment);
            print_row("Provider", &health.payment_provider);
            print_row("Uptime", &format!("{}s", health.uptime_secs));
            print_row("Requests", &health.total_requests.to_string());
        }
    }
}

pub fn print_payment_intent(intent: &CreatePaymentIntentResponse, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(intent),
        OutputFormat::Plain => println!("{}", intent.id),
        OutputFormat::Table => {
            print_row("Id", &intent.id);
            print_row("Amount", &format_amount(intent.amount, &intent.currency));
            print_row("Status", &intent.status);
            if let Some(secret) = &intent.client_secret {
                print_row("Client secret", secret);
            }
        }
    }
}

pub fn print_upload(receipt: &UploadReceipt, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(receipt),
        OutputFormat::Plain => println!("{}", receipt.key),
        OutputFormat::Table => {
            print_row("Key", &receipt.key);
            print_row("Size", &format!("{} bytes", receipt.size_bytes));
            print_row("Settled", if receipt.newly_settled { "yes" } else { "already" });
        }
    }
}

pub fn print_document(doc: &DocumentResponse, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(doc),
        OutputFormat::Plain => print_json(&doc.data),
        OutputFormat::Table => {
            print_row("Path", &doc.path);
            print_row("Version", &doc.version.to_string());
            println!();
            print_json(&doc.data);
        }
    }
}

pub fn print_success(message: &str) {
    println!("OK {}", message);
}

pub fn print_row(key: &str, value: &str) {
    println!("{:<14} {}", format!("{}:", key), value);
}

/// `1234` in `gbp` reads `12.34 GBP`
fn format_amount(minor_units: i64, currency: &str) -> String {
    let sign = if minor_units < 0 { "-" } else { "" };
    let abs = minor_units.unsigned_abs();
    format!(
        "{}{}.{:02} {}",
        sign,
        abs / 100,
        abs % 100,
        currency.to_uppercase()
    )
}


