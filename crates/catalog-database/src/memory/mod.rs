//! In-process backend.
//!
//! Committed rows live in shared [`tables::Tables`]. A transaction buffers
//! its writes in a [`tables::WriteSet`] and applies them in one step at
//! commit, after re-checking unique and referential constraints. Row locks
//! are per-key async mutexes held until the transaction ends, so lock waits
//! and lock timeouts behave like the PostgreSQL backend.

mod acl;
mod change;
mod entity;
mod locks;
mod revision;
mod sequence;
mod tables;
mod tx;

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use catalog_core::AppError;
use catalog_core::result::AppResult;
use catalog_core::types::EntityId;

use crate::store::CatalogDatabase;

use self::locks::LockTable;
use self::sequence::ChangeSequence;
use self::tables::Tables;

pub use self::tx::MemoryTx;

/// Catalog store kept entirely in process memory.
#[derive(Debug, Clone)]
pub struct MemoryCatalog {
    shared: Arc<Shared>,
}

#[derive(Debug)]
struct Shared {
    tables: RwLock<Tables>,
    locks: LockTable,
    changes: Mutex<ChangeSequence>,
    entity_seq: AtomicI64,
    lock_timeout: Duration,
}

impl Shared {
    fn read_tables(&self) -> AppResult<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| AppError::internal("Memory tables lock poisoned"))
    }

    fn write_tables(&self) -> AppResult<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| AppError::internal("Memory tables lock poisoned"))
    }

    fn sequence<R>(&self, f: impl FnOnce(&mut ChangeSequence) -> R) -> AppResult<R> {
        let mut seq = self
            .changes
            .lock()
            .map_err(|_| AppError::internal("Change sequence lock poisoned"))?;
        Ok(f(&mut seq))
    }
}

impl MemoryCatalog {
    /// Create an empty store. `lock_timeout` bounds every row-lock wait.
    pub fn new(lock_timeout: Duration) -> Self {
        Self {
            shared: Arc::new(Shared {
                tables: RwLock::new(Tables::default()),
                locks: LockTable::default(),
                changes: Mutex::new(ChangeSequence::default()),
                entity_seq: AtomicI64::new(0),
                lock_timeout,
            }),
        }
    }

    /// Rewrite a committed parent pointer without any constraint checks.
    ///
    /// Only useful for reproducing corrupted trees.
    pub fn force_parent(&self, id: EntityId, parent_id: Option<EntityId>) -> AppResult<()> {
        let mut tables = self.shared.write_tables()?;
        let entity = tables
            .entities
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(format!("Entity {id} not found")))?;
        entity.parent_id = parent_id;
        Ok(())
    }
}

#[async_trait]
impl CatalogDatabase for MemoryCatalog {
    type Tx = MemoryTx;

    async fn begin(&self) -> AppResult<MemoryTx> {
        debug!("Began memory transaction");
        Ok(MemoryTx::new(Arc::clone(&self.shared)))
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

fn next_entity_id(shared: &Shared) -> EntityId {
    EntityId::new(shared.entity_seq.fetch_add(1, Ordering::SeqCst) + 1)
}
