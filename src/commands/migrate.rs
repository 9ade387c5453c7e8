//! Database migration commands.

use clap::{Args, Subcommand};

use catalog_core::config::{AppConfig, StoreBackend};
use catalog_core::error::AppError;
use catalog_database::DatabasePool;
use catalog_database::connection::mask_password;

use crate::output;

/// Arguments for the migrate command
#[derive(Debug, Args)]
pub struct MigrateArgs {
    /// Migration subcommand
    #[command(subcommand)]
    pub command: MigrateCommand,
}

/// Migration subcommands
#[derive(Debug, Subcommand)]
pub enum MigrateCommand {
    /// Run all pending migrations
    Run,
    /// Show the server version and applied migrations
    Status,
}

/// Execute migration commands
pub async fn execute(args: &MigrateArgs, config: &AppConfig) -> Result<(), AppError> {
    if config.store.backend != StoreBackend::Postgres {
        output::print_warning("The memory backend has no schema to migrate.");
        return Ok(());
    }
    let pool = DatabasePool::connect(&config.database).await?;

    match &args.command {
        MigrateCommand::Run => {
            println!("Running database migrations...");
            pool.migrate().await?;
            output::print_success("All migrations applied successfully.");
        }
        MigrateCommand::Status => {
            let status = pool.status().await?;
            output::print_kv("Database", &mask_password(&config.database.url));
            output::print_kv("Server version", &status.server_version);
            output::print_kv("Applied migrations", &status.applied_migrations.to_string());
        }
    }

    pool.close().await;
    Ok(())
}
