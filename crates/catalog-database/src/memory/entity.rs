//! Entity rows in memory.

use async_trait::async_trait;

use catalog_core::AppError;
use catalog_core::result::AppResult;
use catalog_core::types::EntityId;
use catalog_entity::{Entity, EntityHeader, LineageLink};

use super::locks::LockKey;
use super::tx::MemoryTx;
use crate::store::EntityRows;

#[async_trait]
impl EntityRows for MemoryTx {
    async fn next_entity_id(&mut self) -> AppResult<EntityId> {
        Ok(super::next_entity_id(&self.shared))
    }

    async fn insert_entity(&mut self, entity: &Entity) -> AppResult<()> {
        self.acquire(LockKey::Entity(entity.id)).await?;
        self.view(|v| {
            if v.entity(entity.id).is_some() {
                return Err(AppError::conflict(format!("Entity {} already exists", entity.id)));
            }
            v.check_parent(entity)?;
            v.check_siblings(entity)
        })??;
        self.writes.entities.insert(entity.id, Some(entity.clone()));
        Ok(())
    }

    async fn find_entity(&mut self, id: EntityId) -> AppResult<Option<Entity>> {
        self.view(|v| v.entity(id).cloned())
    }

    async fn lock_entity(&mut self, id: EntityId) -> AppResult<Option<String>> {
        self.acquire(LockKey::Entity(id)).await?;
        self.view(|v| v.entity(id).map(|e| e.etag.clone()))
    }

    async fn peek_entity_etag(&mut self, id: EntityId) -> AppResult<Option<String>> {
        self.view(|v| v.entity(id).map(|e| e.etag.clone()))
    }

    async fn update_entity(&mut self, entity: &Entity) -> AppResult<()> {
        self.acquire(LockKey::Entity(entity.id)).await?;
        self.view(|v| {
            if v.entity(entity.id).is_none() {
                return Err(AppError::not_found(format!("Entity {} not found", entity.id)));
            }
            v.check_parent(entity)?;
            v.check_siblings(entity)
        })??;
        self.writes.entities.insert(entity.id, Some(entity.clone()));
        Ok(())
    }

    async fn delete_entity(&mut self, id: EntityId) -> AppResult<bool> {
        self.acquire(LockKey::Entity(id)).await?;
        self.acquire(LockKey::Acl(id)).await?;
        let versions = self.view(|v| {
            if v.entity(id).is_none() {
                return Ok(None);
            }
            if !v.children(id).is_empty() {
                return Err(AppError::conflict(format!("Entity {id} still has children")));
            }
            Ok(Some(
                v.revisions_of(id)
                    .into_iter()
                    .map(|r| r.version_number)
                    .collect::<Vec<_>>(),
            ))
        })??;

        let Some(versions) = versions else {
            return Ok(false);
        };
        self.writes.entities.insert(id, None);
        for version in versions {
            self.writes.revisions.insert((id, version), None);
        }
        self.writes.acls.insert(id, None);
        Ok(true)
    }

    async fn find_child_by_name(
        &mut self,
        parent_id: Option<EntityId>,
        name: &str,
    ) -> AppResult<Option<Entity>> {
        self.view(|v| {
            v.entities()
                .find(|e| e.parent_id == parent_id && e.name == name)
                .cloned()
        })
    }

    async fn find_child_by_alias(
        &mut self,
        parent_id: Option<EntityId>,
        alias: &str,
    ) -> AppResult<Option<Entity>> {
        self.view(|v| {
            v.entities()
                .find(|e| e.parent_id == parent_id && e.alias.as_deref() == Some(alias))
                .cloned()
        })
    }

    async fn list_children(&mut self, parent_id: EntityId) -> AppResult<Vec<EntityHeader>> {
        self.view(|v| {
            v.children(parent_id)
                .into_iter()
                .map(EntityHeader::from)
                .collect()
        })
    }

    async fn lineage(&mut self, id: EntityId, max_links: usize) -> AppResult<Vec<LineageLink>> {
        self.view(|v| {
            let mut links = Vec::new();
            let mut next = Some(id);
            while let Some(current) = next {
                if links.len() >= max_links {
                    break;
                }
                let Some(entity) = v.entity(current) else {
                    break;
                };
                links.push(LineageLink::new(
                    entity.id,
                    entity.parent_id,
                    v.acl(entity.id).is_some(),
                ));
                next = entity.parent_id;
            }
            links
        })
    }
}
