//! CLI command definitions and dispatch.

pub mod access;
pub mod changes;
pub mod entity;
pub mod migrate;

use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::info;

use catalog_core::config::{AppConfig, StoreBackend};
use catalog_core::error::AppError;
use catalog_core::types::PrincipalId;
use catalog_database::{CatalogDatabase, DatabasePool, MemoryCatalog};
use catalog_service::{CatalogService, RequestContext};

use crate::output::OutputFormat;

/// Data catalog administration
#[derive(Debug, Parser)]
#[command(name = "catalog", version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (extension optional); defaults to
    /// `config/default` plus the `config/$CATALOG_ENV` overlay
    #[arg(short, long)]
    pub config: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Principal recorded as the actor of mutations
    #[arg(long, default_value = "1")]
    pub principal: PrincipalId,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Database migration management
    Migrate(migrate::MigrateArgs),
    /// Entity tree and versions
    Entity(entity::EntityArgs),
    /// Benefactors, ACLs, and access checks
    Access(access::AccessArgs),
    /// Change log
    Changes(changes::ChangesArgs),
}

impl Cli {
    /// Execute the CLI command against the configured backend
    pub async fn execute(&self, config: &AppConfig) -> Result<(), AppError> {
        if let Commands::Migrate(args) = &self.command {
            return migrate::execute(args, config).await;
        }

        info!(backend = %config.store.backend, "Opening catalog store");
        match config.store.backend {
            StoreBackend::Postgres => {
                let pool = DatabasePool::connect(&config.database).await?;
                let service = CatalogService::new(pool.catalog(), &config.limits)?;
                let result = self.dispatch(&service).await;
                pool.close().await;
                result
            }
            StoreBackend::Memory => {
                let db =
                    MemoryCatalog::new(Duration::from_millis(config.database.lock_timeout_ms));
                let service = CatalogService::new(db, &config.limits)?;
                self.dispatch(&service).await
            }
        }
    }

    async fn dispatch<D: CatalogDatabase>(
        &self,
        service: &CatalogService<D>,
    ) -> Result<(), AppError> {
        let ctx = RequestContext::new(self.principal);
        match &self.command {
            Commands::Migrate(_) => Err(AppError::validation(
                "Migrations run before a store is opened",
            )),
            Commands::Entity(args) => entity::execute(args, service, &ctx, self.format).await,
            Commands::Access(args) => access::execute(args, service, &ctx, self.format).await,
            Commands::Changes(args) => changes::execute(args, service, self.format).await,
        }
    }
}
