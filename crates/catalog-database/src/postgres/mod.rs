//! PostgreSQL backend.
//!
//! Row locks are `SELECT ... FOR UPDATE` and every transaction runs with
//! `SET LOCAL lock_timeout`, so a blocked lock surfaces as a retryable
//! `LockTimeout` instead of waiting forever.

mod acl;
mod change;
mod entity;
pub(crate) mod error;
mod revision;

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::debug;

use catalog_core::result::AppResult;

use crate::store::{CatalogDatabase, CatalogTx};

use self::error::db_error;

/// Catalog store backed by PostgreSQL.
#[derive(Debug, Clone)]
pub struct PgCatalog {
    pool: PgPool,
    lock_timeout_ms: u64,
}

impl PgCatalog {
    /// Wrap a pool. `lock_timeout_ms` bounds every row-lock wait.
    pub fn new(pool: PgPool, lock_timeout_ms: u64) -> Self {
        Self {
            pool,
            lock_timeout_ms,
        }
    }

    /// The underlying pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl CatalogDatabase for PgCatalog {
    type Tx = PgTx;

    async fn begin(&self) -> AppResult<PgTx> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("Failed to begin transaction", e))?;

        // SET does not accept bind parameters.
        sqlx::query(&format!("SET LOCAL lock_timeout = {}", self.lock_timeout_ms))
            .execute(&mut *tx)
            .await
            .map_err(|e| db_error("Failed to set lock timeout", e))?;

        debug!(lock_timeout_ms = self.lock_timeout_ms, "Began PostgreSQL transaction");
        Ok(PgTx { tx })
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}

/// An open PostgreSQL transaction.
#[derive(Debug)]
pub struct PgTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl CatalogTx for PgTx {
    async fn commit(self) -> AppResult<()> {
        self.tx
            .commit()
            .await
            .map_err(|e| db_error("Failed to commit transaction", e))
    }

    async fn rollback(self) -> AppResult<()> {
        self.tx
            .rollback()
            .await
            .map_err(|e| db_error("Failed to roll back transaction", e))
    }
}
