//! Connecting the catalog to PostgreSQL.

use std::time::Duration;

use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;

use catalog_core::config::DatabaseConfig;
use catalog_core::result::AppResult;

use crate::migration;
use crate::postgres::PgCatalog;
use crate::postgres::error::db_error;

/// A connected pool plus the lock timeout every catalog transaction uses.
#[derive(Debug, Clone)]
pub struct DatabasePool {
    pool: PgPool,
    lock_timeout_ms: u64,
}

/// What `migrate status` reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaStatus {
    /// `server_version` as reported by PostgreSQL.
    pub server_version: String,
    /// Successfully applied migrations; zero on a fresh database.
    pub applied_migrations: i64,
}

impl DatabasePool {
    /// Open a pool sized by `config`.
    pub async fn connect(config: &DatabaseConfig) -> AppResult<Self> {
        info!(
            url = %mask_password(&config.url),
            max_connections = config.max_connections,
            lock_timeout_ms = config.lock_timeout_ms,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .idle_timeout(Duration::from_secs(config.idle_timeout_seconds))
            .connect(&config.url)
            .await
            .map_err(|e| db_error("Failed to connect to database", e))?;

        Ok(Self {
            pool,
            lock_timeout_ms: config.lock_timeout_ms,
        })
    }

    /// The catalog store over this pool.
    pub fn catalog(&self) -> PgCatalog {
        PgCatalog::new(self.pool.clone(), self.lock_timeout_ms)
    }

    /// Apply pending schema migrations.
    pub async fn migrate(&self) -> AppResult<()> {
        migration::run_migrations(&self.pool).await
    }

    /// Server version and how far the schema has been migrated.
    pub async fn status(&self) -> AppResult<SchemaStatus> {
        let server_version = sqlx::query_scalar::<_, String>("SHOW server_version")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error("Failed to read server version", e))?;

        let applied_migrations = sqlx::query_scalar::<_, i64>(
            "SELECT CASE WHEN to_regclass('_sqlx_migrations') IS NULL THEN 0 \
             ELSE (SELECT COUNT(*) FROM _sqlx_migrations WHERE success) END",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("Failed to read migration history", e))?;

        Ok(SchemaStatus {
            server_version,
            applied_migrations,
        })
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// Replace the password in a connection URL with `****`.
///
/// The host starts after the last `@`, so passwords containing `@` are
/// masked whole.
pub fn mask_password(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };
    let Some((userinfo, host)) = rest.rsplit_once('@') else {
        return url.to_string();
    };
    match userinfo.split_once(':') {
        Some((user, _)) => format!("{scheme}://{user}:****@{host}"),
        None => url.to_string(),
    }
}
