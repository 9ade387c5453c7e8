//! Memory transactions.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, warn};

use catalog_core::result::AppResult;

use super::Shared;
use super::locks::LockKey;
use super::tables::{View, WriteSet};
use crate::store::CatalogTx;

/// An open memory transaction.
///
/// Row locks are held until the transaction is committed, rolled back, or
/// dropped.
pub struct MemoryTx {
    pub(super) shared: Arc<Shared>,
    pub(super) writes: WriteSet,
    pub(super) reserved: Vec<i64>,
    held: HashSet<LockKey>,
    guards: Vec<OwnedMutexGuard<()>>,
}

impl std::fmt::Debug for MemoryTx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryTx")
            .field("locks_held", &self.held.len())
            .field("reserved", &self.reserved)
            .finish()
    }
}

impl MemoryTx {
    pub(super) fn new(shared: Arc<Shared>) -> Self {
        Self {
            shared,
            writes: WriteSet::default(),
            reserved: Vec::new(),
            held: HashSet::new(),
            guards: Vec::new(),
        }
    }

    /// Take a row lock unless this transaction already holds it.
    pub(super) async fn acquire(&mut self, key: LockKey) -> AppResult<()> {
        if self.held.contains(&key) {
            return Ok(());
        }
        let guard = self
            .shared
            .locks
            .acquire(key, self.shared.lock_timeout)
            .await?;
        debug!(?key, "Acquired row lock");
        self.held.insert(key);
        self.guards.push(guard);
        Ok(())
    }

    /// Run `f` against committed rows merged with this transaction's writes.
    pub(super) fn view<R>(&self, f: impl FnOnce(&View<'_>) -> R) -> AppResult<R> {
        let tables = self.shared.read_tables()?;
        Ok(f(&View::new(&tables, &self.writes)))
    }

    fn release_numbers(&mut self) {
        if self.reserved.is_empty() {
            return;
        }
        let reserved = std::mem::take(&mut self.reserved);
        if self
            .shared
            .sequence(|seq| seq.release(&reserved))
            .is_err()
        {
            warn!("Failed to release change numbers; change sequence lock poisoned");
        }
    }
}

#[async_trait]
impl CatalogTx for MemoryTx {
    async fn commit(mut self) -> AppResult<()> {
        let writes = std::mem::take(&mut self.writes);
        if !writes.is_empty() {
            let mut tables = self.shared.write_tables()?;
            View::new(&tables, &writes).check_commit()?;
            tables.apply(writes);
        }
        self.release_numbers();
        debug!(locks = self.held.len(), "Committed memory transaction");
        Ok(())
    }

    async fn rollback(mut self) -> AppResult<()> {
        self.writes = WriteSet::default();
        self.release_numbers();
        debug!("Rolled back memory transaction");
        Ok(())
    }
}

impl Drop for MemoryTx {
    fn drop(&mut self) {
        self.release_numbers();
    }
}
