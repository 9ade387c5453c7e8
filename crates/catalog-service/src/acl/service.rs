//! ACL create/read/update/delete.

use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use catalog_core::error::AppError;
use catalog_core::result::AppResult;
use catalog_core::types::EntityId;
use catalog_database::CatalogTx;
use catalog_entity::{AccessControlList, ChangeType, ObjectType, ResourceAccess};

use crate::changelog::ChangeLog;
use crate::concurrency::ConcurrencyController;
use crate::context::RequestContext;

/// Manages the single optional ACL of each entity.
///
/// ACL mutations write a change record of type `ACCESS_CONTROL_LIST` keyed
/// by the resource id.
#[derive(Debug, Clone)]
pub struct AclStore {
    controller: Arc<ConcurrencyController>,
    changes: Arc<ChangeLog>,
}

impl AclStore {
    /// Creates a new ACL store.
    pub fn new(controller: Arc<ConcurrencyController>, changes: Arc<ChangeLog>) -> Self {
        Self {
            controller,
            changes,
        }
    }

    /// Creates the ACL of `resource_id`, making it a benefactor.
    pub async fn create<T: CatalogTx>(
        &self,
        tx: &mut T,
        ctx: &RequestContext,
        resource_id: EntityId,
        resource_access: Vec<ResourceAccess>,
    ) -> AppResult<AccessControlList> {
        if tx.find_entity(resource_id).await?.is_none() {
            return Err(AppError::not_found(format!("Entity {resource_id} not found")));
        }
        if tx.find_acl(resource_id).await?.is_some() {
            return Err(AppError::conflict(format!(
                "Entity {resource_id} already has an ACL"
            )));
        }

        let now = Utc::now();
        let mut acl = AccessControlList {
            resource_id,
            etag: self.controller.new_etag(),
            created_by: ctx.principal_id,
            created_on: now,
            modified_on: now,
            resource_access,
        };
        acl.validate()?;
        acl.normalize();

        tx.insert_acl(&acl).await?;
        self.changes
            .append(
                tx,
                resource_id.value(),
                ObjectType::AccessControlList,
                ChangeType::Create,
                Some(acl.etag.clone()),
            )
            .await?;

        info!(resource_id = %resource_id, grants = acl.resource_access.len(), "Created ACL");
        Ok(acl)
    }

    /// Reads the ACL of `resource_id`.
    pub async fn get<T: CatalogTx>(&self, tx: &mut T, resource_id: EntityId) -> AppResult<AccessControlList> {
        tx.find_acl(resource_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("ACL for {resource_id} not found")))
    }

    /// Replaces the grants of an ACL.
    ///
    /// `acl.etag` must match the stored eTag; a stale one fails with
    /// `Conflict` without writing.
    pub async fn update<T: CatalogTx>(
        &self,
        tx: &mut T,
        ctx: &RequestContext,
        acl: AccessControlList,
    ) -> AppResult<AccessControlList> {
        acl.validate()?;
        self.controller
            .lock_acl_for_update(tx, acl.resource_id, &acl.etag)
            .await?;
        let stored = self.get(tx, acl.resource_id).await?;

        let mut updated = AccessControlList {
            resource_id: stored.resource_id,
            etag: self.controller.new_etag(),
            created_by: stored.created_by,
            created_on: stored.created_on,
            modified_on: Utc::now(),
            resource_access: acl.resource_access,
        };
        updated.normalize();

        tx.update_acl(&updated).await?;
        self.changes
            .append(
                tx,
                updated.resource_id.value(),
                ObjectType::AccessControlList,
                ChangeType::Update,
                Some(updated.etag.clone()),
            )
            .await?;

        info!(
            resource_id = %updated.resource_id,
            principal_id = %ctx.principal_id,
            "Updated ACL"
        );
        Ok(updated)
    }

    /// Deletes the ACL of `resource_id`; the entity then inherits again.
    ///
    /// Returns false when there was no ACL, in which case nothing is logged.
    pub async fn delete<T: CatalogTx>(
        &self,
        tx: &mut T,
        ctx: &RequestContext,
        resource_id: EntityId,
    ) -> AppResult<bool> {
        if !tx.delete_acl(resource_id).await? {
            return Ok(false);
        }
        self.changes
            .append(
                tx,
                resource_id.value(),
                ObjectType::AccessControlList,
                ChangeType::Delete,
                None,
            )
            .await?;

        info!(resource_id = %resource_id, principal_id = %ctx.principal_id, "Deleted ACL");
        Ok(true)
    }
}
