//! Revision rows in memory.

use async_trait::async_trait;

use catalog_core::AppError;
use catalog_core::result::AppResult;
use catalog_core::types::EntityId;
use catalog_entity::Revision;

use super::locks::LockKey;
use super::tx::MemoryTx;
use crate::store::RevisionRows;

#[async_trait]
impl RevisionRows for MemoryTx {
    async fn insert_revision(&mut self, revision: &Revision) -> AppResult<()> {
        let key = (revision.entity_id, revision.version_number);
        self.acquire(LockKey::Entity(revision.entity_id)).await?;
        self.view(|v| {
            if v.entity(revision.entity_id).is_none() {
                return Err(AppError::conflict(format!(
                    "Entity {} no longer exists",
                    revision.entity_id
                )));
            }
            if v.revision(key.0, key.1).is_some() {
                return Err(AppError::conflict(format!(
                    "Version {} of {} already exists",
                    key.1, key.0
                )));
            }
            v.check_label(revision)
        })??;
        self.writes.revisions.insert(key, Some(revision.clone()));
        Ok(())
    }

    async fn find_revision(
        &mut self,
        entity_id: EntityId,
        version_number: i64,
    ) -> AppResult<Option<Revision>> {
        self.view(|v| v.revision(entity_id, version_number).cloned())
    }

    async fn find_revision_by_label(
        &mut self,
        entity_id: EntityId,
        label: &str,
    ) -> AppResult<Option<Revision>> {
        self.view(|v| {
            v.revisions_of(entity_id)
                .into_iter()
                .find(|r| r.label == label)
                .cloned()
        })
    }

    async fn update_revision(&mut self, revision: &Revision) -> AppResult<()> {
        let key = (revision.entity_id, revision.version_number);
        self.acquire(LockKey::Entity(revision.entity_id)).await?;
        self.view(|v| {
            if v.revision(key.0, key.1).is_none() {
                return Err(AppError::not_found(format!(
                    "Version {} of {} not found",
                    key.1, key.0
                )));
            }
            v.check_label(revision)
        })??;
        self.writes.revisions.insert(key, Some(revision.clone()));
        Ok(())
    }

    async fn delete_revision(&mut self, entity_id: EntityId, version_number: i64) -> AppResult<bool> {
        self.acquire(LockKey::Entity(entity_id)).await?;
        let existed = self.view(|v| v.revision(entity_id, version_number).is_some())?;
        if existed {
            self.writes
                .revisions
                .insert((entity_id, version_number), None);
        }
        Ok(existed)
    }

    async fn list_revisions(&mut self, entity_id: EntityId) -> AppResult<Vec<Revision>> {
        self.view(|v| {
            v.revisions_of(entity_id)
                .into_iter()
                .rev()
                .cloned()
                .collect()
        })
    }
}
