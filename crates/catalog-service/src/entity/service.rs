//! Entity CRUD, moves, and tree reads.

use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use validator::Validate;

use catalog_core::config::LimitsConfig;
use catalog_core::error::AppError;
use catalog_core::result::AppResult;
use catalog_core::types::EntityId;
use catalog_database::CatalogTx;
use catalog_entity::entity::request::validate_alias;
use catalog_entity::{
    ChangeType, Entity, EntityHeader, EntityUpdate, NewEntity, ObjectType, Revision,
    VersionedEntity,
};

use super::tree::{collect_subtree, depth_of};
use crate::changelog::ChangeLog;
use crate::concurrency::ConcurrencyController;
use crate::context::RequestContext;

/// Owns the entity tree and its revisions.
///
/// Every successful mutation assigns a fresh eTag and writes exactly one
/// change record in the caller's transaction.
#[derive(Debug, Clone)]
pub struct EntityStore {
    /// Maximum number of levels in the tree.
    pub(crate) max_tree_depth: usize,
    /// Maximum number of levels a delete may cascade through.
    pub(crate) max_cascade_depth: usize,
    /// Lock and eTag handling.
    pub(crate) controller: Arc<ConcurrencyController>,
    /// Change log written by every mutation.
    pub(crate) changes: Arc<ChangeLog>,
}

impl EntityStore {
    /// Creates a new entity store.
    pub fn new(
        limits: &LimitsConfig,
        controller: Arc<ConcurrencyController>,
        changes: Arc<ChangeLog>,
    ) -> Self {
        Self {
            max_tree_depth: limits.max_tree_depth as usize,
            max_cascade_depth: limits.max_cascade_depth as usize,
            controller,
            changes,
        }
    }

    /// Creates an entity together with its first revision.
    pub async fn create<T: CatalogTx>(
        &self,
        tx: &mut T,
        ctx: &RequestContext,
        req: NewEntity,
    ) -> AppResult<VersionedEntity> {
        validate_request(&req)?;
        check_alias(req.alias.as_deref())?;
        req.annotations.validate()?;

        if let Some(parent_id) = req.parent_id {
            if tx.find_entity(parent_id).await?.is_none() {
                return Err(AppError::not_found(format!(
                    "Parent entity {parent_id} not found"
                )));
            }
            let parent_depth = depth_of(tx, parent_id, self.max_tree_depth).await?;
            if parent_depth >= self.max_tree_depth {
                return Err(AppError::limit_exceeded(format!(
                    "The tree may not be deeper than {} levels",
                    self.max_tree_depth
                )));
            }
        }
        self.ensure_name_free(tx, req.parent_id, &req.name, None)
            .await?;
        if let Some(alias) = &req.alias {
            self.ensure_alias_free(tx, req.parent_id, alias, None)
                .await?;
        }

        let NewEntity {
            parent_id,
            name,
            alias,
            entity_type,
            version_label,
            version_comment,
            content_reference,
            annotations,
        } = req;

        let id = tx.next_entity_id().await?;
        let etag = self.controller.new_etag();
        let now = Utc::now();
        let entity = Entity {
            id,
            parent_id,
            name,
            alias,
            entity_type,
            current_version: 1,
            max_version: 1,
            etag: etag.clone(),
            created_by: ctx.principal_id,
            created_on: now,
            modified_by: ctx.principal_id,
            modified_on: now,
        };
        let revision = Revision {
            entity_id: id,
            version_number: 1,
            label: version_label.unwrap_or_else(|| Revision::default_label(1)),
            comment: version_comment,
            content_reference,
            annotations,
            etag: etag.clone(),
            modified_by: ctx.principal_id,
            modified_on: now,
        };

        tx.insert_entity(&entity).await?;
        tx.insert_revision(&revision).await?;
        self.changes
            .append(tx, id.value(), ObjectType::Entity, ChangeType::Create, Some(etag))
            .await?;

        info!(
            entity_id = %id,
            parent_id = ?parent_id,
            name = %entity.name,
            entity_type = %entity.entity_type,
            "Created entity"
        );
        Ok(VersionedEntity { entity, revision })
    }

    /// Reads an entity with its current revision, or with `version` when given.
    pub async fn get<T: CatalogTx>(
        &self,
        tx: &mut T,
        id: EntityId,
        version: Option<i64>,
    ) -> AppResult<VersionedEntity> {
        let entity = require_entity(tx, id).await?;
        let version = version.unwrap_or(entity.current_version);
        let revision = require_revision(tx, id, version).await?;
        Ok(VersionedEntity { entity, revision })
    }

    /// Updates an entity and its current revision.
    ///
    /// The caller's eTag is compared with the locked row; a stale eTag fails
    /// with `Conflict` and nothing is written.
    pub async fn update<T: CatalogTx>(
        &self,
        tx: &mut T,
        ctx: &RequestContext,
        req: EntityUpdate,
    ) -> AppResult<VersionedEntity> {
        validate_request(&req)?;
        check_alias(req.alias.as_deref())?;
        req.annotations.validate()?;

        self.controller
            .lock_for_update(tx, req.id, &req.etag)
            .await?;
        let mut entity = require_entity(tx, req.id).await?;
        let mut revision = require_revision(tx, entity.id, entity.current_version).await?;

        if entity.name != req.name {
            self.ensure_name_free(tx, entity.parent_id, &req.name, Some(entity.id))
                .await?;
        }
        if let Some(alias) = req.alias.as_deref().filter(|a| entity.alias.as_deref() != Some(*a)) {
            self.ensure_alias_free(tx, entity.parent_id, alias, Some(entity.id))
                .await?;
        }
        if revision.label != req.version_label {
            ensure_label_free(tx, entity.id, &req.version_label).await?;
        }

        let etag = self.controller.new_etag();
        let now = Utc::now();
        entity.name = req.name;
        entity.alias = req.alias;
        entity.etag = etag.clone();
        entity.modified_by = ctx.principal_id;
        entity.modified_on = now;

        revision.label = req.version_label;
        revision.comment = req.version_comment;
        revision.content_reference = req.content_reference;
        revision.annotations = req.annotations;
        revision.etag = etag.clone();
        revision.modified_by = ctx.principal_id;
        revision.modified_on = now;

        tx.update_entity(&entity).await?;
        tx.update_revision(&revision).await?;
        self.changes
            .append(tx, entity.id.value(), ObjectType::Entity, ChangeType::Update, Some(etag))
            .await?;

        info!(entity_id = %entity.id, version = revision.version_number, "Updated entity");
        Ok(VersionedEntity { entity, revision })
    }

    /// Deletes an entity, its descendants, their revisions, and their ACLs.
    ///
    /// A subtree deeper than the cascade limit is rejected as a whole with
    /// `LimitExceeded`. Returns the number of entities removed.
    pub async fn delete<T: CatalogTx>(
        &self,
        tx: &mut T,
        ctx: &RequestContext,
        id: EntityId,
    ) -> AppResult<usize> {
        let levels = collect_subtree(tx, id, self.max_cascade_depth).await?;
        let all: Vec<EntityId> = levels.iter().flatten().copied().collect();
        self.controller.lock_entities(tx, &all).await?;

        for level in levels.iter().rev() {
            for entity_id in level {
                tx.delete_entity(*entity_id).await?;
            }
        }
        self.changes
            .append(tx, id.value(), ObjectType::Entity, ChangeType::Delete, None)
            .await?;

        info!(
            entity_id = %id,
            removed = all.len(),
            principal_id = %ctx.principal_id,
            "Deleted entity"
        );
        Ok(all.len())
    }

    /// Moves an entity under a new parent.
    pub async fn move_entity<T: CatalogTx>(
        &self,
        tx: &mut T,
        ctx: &RequestContext,
        id: EntityId,
        new_parent_id: EntityId,
        etag: &str,
    ) -> AppResult<VersionedEntity> {
        if id == new_parent_id {
            return Err(AppError::validation("An entity cannot be its own parent"));
        }
        self.controller.lock_for_update(tx, id, etag).await?;
        let mut entity = require_entity(tx, id).await?;
        if entity.is_root() {
            return Err(AppError::validation(format!("Root entity {id} cannot be moved")));
        }
        if entity.parent_id == Some(new_parent_id) {
            let revision = require_revision(tx, id, entity.current_version).await?;
            return Ok(VersionedEntity { entity, revision });
        }

        let links = tx.lineage(new_parent_id, self.max_tree_depth + 1).await?;
        if links.is_empty() {
            return Err(AppError::not_found(format!(
                "Parent entity {new_parent_id} not found"
            )));
        }
        if links.iter().any(|link| link.id == id) {
            return Err(AppError::validation(format!(
                "Cannot move {id} beneath its own descendant {new_parent_id}"
            )));
        }
        let parent_depth = super::tree::chain_depth(new_parent_id, &links, self.max_tree_depth)?;
        let height = collect_subtree(tx, id, self.max_tree_depth).await?.len();
        if parent_depth + height > self.max_tree_depth {
            return Err(AppError::limit_exceeded(format!(
                "Moving {id} would make the tree deeper than {} levels",
                self.max_tree_depth
            )));
        }

        self.ensure_name_free(tx, Some(new_parent_id), &entity.name, Some(id))
            .await?;
        if let Some(alias) = entity.alias.clone() {
            self.ensure_alias_free(tx, Some(new_parent_id), &alias, Some(id))
                .await?;
        }

        let etag = self.controller.new_etag();
        entity.parent_id = Some(new_parent_id);
        entity.etag = etag.clone();
        entity.modified_by = ctx.principal_id;
        entity.modified_on = Utc::now();
        tx.update_entity(&entity).await?;
        self.changes
            .append(tx, id.value(), ObjectType::Entity, ChangeType::Update, Some(etag))
            .await?;

        info!(entity_id = %id, new_parent_id = %new_parent_id, "Moved entity");
        let revision = require_revision(tx, id, entity.current_version).await?;
        Ok(VersionedEntity { entity, revision })
    }

    /// Headers from the root down to `id`.
    pub async fn get_path<T: CatalogTx>(&self, tx: &mut T, id: EntityId) -> AppResult<Vec<EntityHeader>> {
        let links = tx.lineage(id, self.max_tree_depth + 1).await?;
        super::tree::chain_depth(id, &links, self.max_tree_depth)?;

        let mut path = Vec::with_capacity(links.len());
        for link in links.iter().rev() {
            let entity = require_entity(tx, link.id).await?;
            path.push(EntityHeader::from(&entity));
        }
        Ok(path)
    }

    /// Direct children of an entity, ascending by id.
    pub async fn get_children<T: CatalogTx>(
        &self,
        tx: &mut T,
        parent_id: EntityId,
    ) -> AppResult<Vec<EntityHeader>> {
        require_entity(tx, parent_id).await?;
        tx.list_children(parent_id).await
    }

    /// Looks up a child by alias.
    pub async fn get_by_alias<T: CatalogTx>(
        &self,
        tx: &mut T,
        parent_id: Option<EntityId>,
        alias: &str,
    ) -> AppResult<Entity> {
        tx.find_child_by_alias(parent_id, alias)
            .await?
            .ok_or_else(|| AppError::not_found(format!("No entity with alias '{alias}'")))
    }

    /// Looks up a child by name.
    pub async fn get_child_by_name<T: CatalogTx>(
        &self,
        tx: &mut T,
        parent_id: Option<EntityId>,
        name: &str,
    ) -> AppResult<Entity> {
        tx.find_child_by_name(parent_id, name)
            .await?
            .ok_or_else(|| AppError::not_found(format!("No entity named '{name}'")))
    }

    async fn ensure_name_free<T: CatalogTx>(
        &self,
        tx: &mut T,
        parent_id: Option<EntityId>,
        name: &str,
        except: Option<EntityId>,
    ) -> AppResult<()> {
        match tx.find_child_by_name(parent_id, name).await? {
            Some(other) if Some(other.id) != except => Err(AppError::name_conflict(format!(
                "An entity named '{name}' already exists in this location"
            ))),
            _ => Ok(()),
        }
    }

    async fn ensure_alias_free<T: CatalogTx>(
        &self,
        tx: &mut T,
        parent_id: Option<EntityId>,
        alias: &str,
        except: Option<EntityId>,
    ) -> AppResult<()> {
        match tx.find_child_by_alias(parent_id, alias).await? {
            Some(other) if Some(other.id) != except => Err(AppError::name_conflict(format!(
                "An entity with alias '{alias}' already exists in this location"
            ))),
            _ => Ok(()),
        }
    }
}

/// Run derive-based validation and convert the report.
pub(crate) fn validate_request(req: &impl Validate) -> AppResult<()> {
    req.validate()
        .map_err(|e| AppError::validation(format!("Invalid request: {e}")))
}

fn check_alias(alias: Option<&str>) -> AppResult<()> {
    match alias {
        Some(alias) => validate_alias(alias).map_err(|_| {
            AppError::validation(format!(
                "Invalid alias '{alias}': only letters, digits, and underscores are allowed"
            ))
        }),
        None => Ok(()),
    }
}

pub(crate) async fn require_entity<T: CatalogTx>(tx: &mut T, id: EntityId) -> AppResult<Entity> {
    tx.find_entity(id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Entity {id} not found")))
}

pub(crate) async fn require_revision<T: CatalogTx>(
    tx: &mut T,
    id: EntityId,
    version: i64,
) -> AppResult<Revision> {
    tx.find_revision(id, version)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Version {version} of {id} not found")))
}

pub(crate) async fn ensure_label_free<T: CatalogTx>(
    tx: &mut T,
    id: EntityId,
    label: &str,
) -> AppResult<()> {
    if tx.find_revision_by_label(id, label).await?.is_some() {
        return Err(AppError::conflict(format!(
            "Entity {id} already has a version labeled '{label}'"
        )));
    }
    Ok(())
}
