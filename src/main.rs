//! Data catalog command-line entry point.
//!
//! Loads configuration, initializes logging, opens the configured store
//! backend, and runs one catalog command against it.

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt};

use catalog_core::config::{AppConfig, LoggingConfig};

mod commands;
mod output;

use commands::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => AppConfig::from_file(path),
        None => {
            let env = std::env::var("CATALOG_ENV").unwrap_or_else(|_| "development".to_string());
            AppConfig::load(&env)
        }
    };
    let config = match loaded {
        Ok(c) => c,
        Err(e) => {
            output::print_error(&format!("Failed to load configuration: {e}"));
            std::process::exit(1);
        }
    };

    init_logging(&config.logging);

    if let Err(e) = cli.execute(&config).await {
        tracing::error!(error = %e, kind = ?e.kind, "Command failed");
        output::print_error(&e.to_string());
        std::process::exit(1);
    }
}

/// Initialize tracing from the logging section; `RUST_LOG` wins when set.
fn init_logging(config: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    match config.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_writer(std::io::stderr)
                .init();
        }
        _ => {
            fmt()
                .with_env_filter(filter)
                .with_target(true)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}
