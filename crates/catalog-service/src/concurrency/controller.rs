//! Deterministic row locking plus eTag compare-and-swap.
//!
//! Every multi-row lock is taken in ascending id order, whatever order the
//! caller asked for, so two transactions can never wait on each other in a
//! cycle. Locking needs an open transaction: the methods take the
//! transaction handle itself.

use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use catalog_core::error::AppError;
use catalog_core::result::AppResult;
use catalog_core::types::EntityId;
use catalog_database::{AclRows, EntityRows};

/// A locked entity and the eTag read under the lock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityLock {
    /// Locked entity.
    pub id: EntityId,
    /// Its current eTag.
    pub etag: String,
}

/// Acquires row locks and enforces optimistic concurrency.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConcurrencyController;

impl ConcurrencyController {
    /// Creates a new controller.
    pub fn new() -> Self {
        Self
    }

    /// A fresh eTag.
    pub fn new_etag(&self) -> String {
        Uuid::new_v4().to_string()
    }

    /// Lock `ids` in ascending order and return their eTags in that order.
    ///
    /// Duplicate ids are locked once. A missing entity fails with
    /// `NotFound`; locks already taken stay held until the transaction ends.
    pub async fn lock_entities<T>(&self, tx: &mut T, ids: &[EntityId]) -> AppResult<Vec<EntityLock>>
    where
        T: EntityRows + ?Sized,
    {
        let ordered = lock_order(ids);
        let mut locks = Vec::with_capacity(ordered.len());
        for id in ordered {
            let etag = tx
                .lock_entity(id)
                .await?
                .ok_or_else(|| AppError::not_found(format!("Entity {id} not found")))?;
            debug!(entity_id = %id, "Locked entity");
            locks.push(EntityLock { id, etag });
        }
        Ok(locks)
    }

    /// Read the current eTag without locking.
    pub async fn peek_etag<T>(&self, tx: &mut T, id: EntityId) -> AppResult<String>
    where
        T: EntityRows + ?Sized,
    {
        tx.peek_entity_etag(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Entity {id} not found")))
    }

    /// Lock one entity and check the caller's eTag against the locked row.
    ///
    /// A mismatch fails with `Conflict` before anything is written.
    pub async fn lock_for_update<T>(&self, tx: &mut T, id: EntityId, expected: &str) -> AppResult<()>
    where
        T: EntityRows + ?Sized,
    {
        let current = tx
            .lock_entity(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Entity {id} not found")))?;
        check_etag(&format!("Entity {id}"), &current, expected)
    }

    /// Lock an ACL and check the caller's eTag against the locked row.
    pub async fn lock_acl_for_update<T>(
        &self,
        tx: &mut T,
        resource_id: EntityId,
        expected: &str,
    ) -> AppResult<()>
    where
        T: AclRows + ?Sized,
    {
        let current = tx
            .lock_acl(resource_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("ACL for {resource_id} not found")))?;
        check_etag(&format!("ACL for {resource_id}"), &current, expected)
    }
}

/// Ascending, duplicate-free lock order.
pub fn lock_order(ids: &[EntityId]) -> Vec<EntityId> {
    let mut ordered = ids.to_vec();
    ordered.sort_unstable();
    ordered.dedup();
    ordered
}

fn check_etag(what: &str, current: &str, expected: &str) -> AppResult<()> {
    if current == expected {
        Ok(())
    } else {
        Err(AppError::conflict(format!(
            "{what} was modified concurrently; re-read it and retry"
        )))
    }
}
