//! Revision operations: snapshot, roll back, list.

use chrono::Utc;
use tracing::info;

use catalog_core::error::AppError;
use catalog_core::result::AppResult;
use catalog_core::types::EntityId;
use catalog_database::CatalogTx;
use catalog_entity::{ChangeType, NewVersion, ObjectType, Revision, VersionedEntity};

use super::service::{
    EntityStore, ensure_label_free, require_entity, require_revision, validate_request,
};
use crate::context::RequestContext;

impl EntityStore {
    /// Snapshots a new revision and makes it current.
    ///
    /// The content reference and annotations of the previous current
    /// revision carry forward unless the request replaces them. A label
    /// already used by another revision is a `Conflict`.
    pub async fn create_new_version<T: CatalogTx>(
        &self,
        tx: &mut T,
        ctx: &RequestContext,
        req: NewVersion,
    ) -> AppResult<VersionedEntity> {
        validate_request(&req)?;
        if let Some(annotations) = &req.annotations {
            annotations.validate()?;
        }

        self.controller
            .lock_for_update(tx, req.id, &req.etag)
            .await?;
        let mut entity = require_entity(tx, req.id).await?;
        let previous = require_revision(tx, entity.id, entity.current_version).await?;

        let version_number = entity.max_version + 1;
        let label = req
            .label
            .unwrap_or_else(|| Revision::default_label(version_number));
        ensure_label_free(tx, entity.id, &label).await?;

        let etag = self.controller.new_etag();
        let now = Utc::now();
        let revision = Revision {
            entity_id: entity.id,
            version_number,
            label,
            comment: req.comment,
            content_reference: req.content_reference.or(previous.content_reference),
            annotations: req.annotations.unwrap_or(previous.annotations),
            etag: etag.clone(),
            modified_by: ctx.principal_id,
            modified_on: now,
        };
        tx.insert_revision(&revision).await?;

        entity.current_version = version_number;
        entity.max_version = version_number;
        entity.etag = etag.clone();
        entity.modified_by = ctx.principal_id;
        entity.modified_on = now;
        tx.update_entity(&entity).await?;

        self.changes
            .append(tx, entity.id.value(), ObjectType::Entity, ChangeType::Update, Some(etag))
            .await?;

        info!(entity_id = %entity.id, version = version_number, "Created new version");
        Ok(VersionedEntity { entity, revision })
    }

    /// Deletes one revision.
    ///
    /// The last remaining revision cannot be deleted. Deleting the current
    /// revision rolls the current pointer back to the highest remaining
    /// version, and with it the visible annotations.
    pub async fn delete_version<T: CatalogTx>(
        &self,
        tx: &mut T,
        ctx: &RequestContext,
        id: EntityId,
        version_number: i64,
    ) -> AppResult<VersionedEntity> {
        self.controller.lock_entities(tx, &[id]).await?;
        let mut entity = require_entity(tx, id).await?;

        let versions: Vec<i64> = tx
            .list_revisions(id)
            .await?
            .into_iter()
            .map(|r| r.version_number)
            .collect();
        if !versions.contains(&version_number) {
            return Err(AppError::not_found(format!(
                "Version {version_number} of {id} not found"
            )));
        }
        if versions.len() == 1 {
            return Err(AppError::validation(format!(
                "Cannot delete the only version of {id}"
            )));
        }

        tx.delete_revision(id, version_number).await?;
        if entity.current_version == version_number {
            entity.current_version = versions
                .iter()
                .copied()
                .filter(|v| *v != version_number)
                .max()
                .ok_or_else(|| AppError::internal(format!("No remaining version of {id}")))?;
        }

        let etag = self.controller.new_etag();
        entity.etag = etag.clone();
        entity.modified_by = ctx.principal_id;
        entity.modified_on = Utc::now();
        tx.update_entity(&entity).await?;
        self.changes
            .append(tx, id.value(), ObjectType::Entity, ChangeType::Update, Some(etag))
            .await?;

        info!(
            entity_id = %id,
            deleted_version = version_number,
            current_version = entity.current_version,
            "Deleted version"
        );
        let revision = require_revision(tx, id, entity.current_version).await?;
        Ok(VersionedEntity { entity, revision })
    }

    /// All revisions, newest first.
    pub async fn list_versions<T: CatalogTx>(&self, tx: &mut T, id: EntityId) -> AppResult<Vec<Revision>> {
        require_entity(tx, id).await?;
        tx.list_revisions(id).await
    }

    /// All version numbers, newest first.
    pub async fn get_version_numbers<T: CatalogTx>(
        &self,
        tx: &mut T,
        id: EntityId,
    ) -> AppResult<Vec<i64>> {
        Ok(self
            .list_versions(tx, id)
            .await?
            .into_iter()
            .map(|r| r.version_number)
            .collect())
    }
}
