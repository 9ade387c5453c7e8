//! Per-row async locks.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use catalog_core::AppError;
use catalog_core::result::AppResult;
use catalog_core::types::EntityId;
use catalog_entity::ObjectType;

/// Identity of a lockable row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(super) enum LockKey {
    Entity(EntityId),
    Acl(EntityId),
    Change(ObjectType, i64),
}

/// Registry of row mutexes, created on first use.
#[derive(Debug, Default)]
pub(super) struct LockTable {
    rows: DashMap<LockKey, Arc<Mutex<()>>>,
}

impl LockTable {
    /// Wait for the row lock, failing with `LockTimeout` after `timeout`.
    pub(super) async fn acquire(
        &self,
        key: LockKey,
        timeout: Duration,
    ) -> AppResult<OwnedMutexGuard<()>> {
        let mutex = Arc::clone(self.rows.entry(key).or_default().value());
        tokio::time::timeout(timeout, mutex.lock_owned())
            .await
            .map_err(|_| {
                AppError::lock_timeout(format!(
                    "Timed out after {}ms waiting for lock on {key:?}",
                    timeout.as_millis()
                ))
            })
    }
}
