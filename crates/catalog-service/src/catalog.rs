//! The coordinating service.
//!
//! [`CatalogService`] owns the database handle and one instance of every
//! component. Each public method runs in its own transaction: committed on
//! success, rolled back on any error, so partial mutations are never
//! visible. [`CatalogService::with_transaction`] lets callers compose
//! several operations in one transaction instead.

use std::collections::BTreeSet;
use std::sync::Arc;

use futures::future::BoxFuture;
use tracing::warn;

use catalog_auth::{AccessChecker, BenefactorResolver};
use catalog_core::config::LimitsConfig;
use catalog_core::result::AppResult;
use catalog_core::types::{EntityId, PrincipalId};
use catalog_database::{CatalogDatabase, CatalogTx};
use catalog_entity::{
    AccessControlList, AccessType, ChangeRecord, ChangeType, Entity, EntityHeader, EntityUpdate,
    NewEntity, NewVersion, ObjectType, ResourceAccess, Revision, VersionedEntity,
};

use crate::acl::AclStore;
use crate::changelog::ChangeLog;
use crate::concurrency::{ConcurrencyController, EntityLock};
use crate::context::RequestContext;
use crate::entity::EntityStore;

/// One instance of every component, shared by all transactions.
#[derive(Debug, Clone)]
pub struct CatalogComponents {
    /// Entity and revision store.
    pub entities: EntityStore,
    /// ACL store.
    pub acls: AclStore,
    /// Change log.
    pub changes: Arc<ChangeLog>,
    /// Lock and eTag handling.
    pub controller: Arc<ConcurrencyController>,
    /// Inherited access checks.
    pub checker: AccessChecker,
}

impl CatalogComponents {
    /// Wire every component from the platform limits.
    pub fn new(limits: &LimitsConfig) -> AppResult<Self> {
        limits.validate()?;
        let controller = Arc::new(ConcurrencyController::new());
        let changes = Arc::new(ChangeLog::new(limits));
        Ok(Self {
            entities: EntityStore::new(limits, Arc::clone(&controller), Arc::clone(&changes)),
            acls: AclStore::new(Arc::clone(&controller), Arc::clone(&changes)),
            changes,
            controller,
            checker: AccessChecker::new(BenefactorResolver::new(limits)),
        })
    }
}

/// An open transaction plus the components, handed to
/// [`CatalogService::with_transaction`] callbacks.
pub struct TxScope<T> {
    tx: T,
    ctx: RequestContext,
    components: Arc<CatalogComponents>,
}

impl<T: CatalogTx> TxScope<T> {
    /// Split into the transaction, the components, and the request context.
    pub fn parts(&mut self) -> (&mut T, &CatalogComponents, &RequestContext) {
        (&mut self.tx, &self.components, &self.ctx)
    }

    /// Lock entities in ascending id order.
    pub async fn lock_entities(&mut self, ids: &[EntityId]) -> AppResult<Vec<EntityLock>> {
        self.components.controller.lock_entities(&mut self.tx, ids).await
    }

    /// Read an entity with its current revision.
    pub async fn get_entity(&mut self, id: EntityId) -> AppResult<VersionedEntity> {
        self.components.entities.get(&mut self.tx, id, None).await
    }

    /// Update an entity inside this transaction.
    pub async fn update_entity(&mut self, req: EntityUpdate) -> AppResult<VersionedEntity> {
        self.components
            .entities
            .update(&mut self.tx, &self.ctx, req)
            .await
    }

    /// Append a change inside this transaction.
    pub async fn append_change(
        &mut self,
        object_id: i64,
        object_type: ObjectType,
        change_type: ChangeType,
        object_etag: Option<String>,
    ) -> AppResult<ChangeRecord> {
        self.components
            .changes
            .append(&mut self.tx, object_id, object_type, change_type, object_etag)
            .await
    }
}

/// Coordinates the catalog components over one database.
pub struct CatalogService<D: CatalogDatabase> {
    db: D,
    components: Arc<CatalogComponents>,
}

impl<D: CatalogDatabase> std::fmt::Debug for CatalogService<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogService")
            .field("backend", &self.db.backend_name())
            .finish()
    }
}

impl<D: CatalogDatabase> CatalogService<D> {
    /// Creates a new catalog service.
    pub fn new(db: D, limits: &LimitsConfig) -> AppResult<Self> {
        Ok(Self {
            db,
            components: Arc::new(CatalogComponents::new(limits)?),
        })
    }

    /// The database handle.
    pub fn database(&self) -> &D {
        &self.db
    }

    /// The components.
    pub fn components(&self) -> &CatalogComponents {
        &self.components
    }

    /// Run `f` in one transaction, committing only if it succeeds.
    pub async fn with_transaction<R, F>(&self, ctx: &RequestContext, f: F) -> AppResult<R>
    where
        R: Send,
        F: for<'c> FnOnce(&'c mut TxScope<D::Tx>) -> BoxFuture<'c, AppResult<R>> + Send,
    {
        let tx = self.db.begin().await?;
        let mut scope = TxScope {
            tx,
            ctx: ctx.clone(),
            components: Arc::clone(&self.components),
        };
        let result = f(&mut scope).await;
        finish(scope.tx, result).await
    }

    // Entity store

    /// Creates an entity with version 1.
    pub async fn create_entity(&self, ctx: &RequestContext, req: NewEntity) -> AppResult<VersionedEntity> {
        let mut tx = self.db.begin().await?;
        let result = self.components.entities.create(&mut tx, ctx, req).await;
        finish(tx, result).await
    }

    /// Reads an entity at its current version or at `version`.
    pub async fn get_entity(&self, id: EntityId, version: Option<i64>) -> AppResult<VersionedEntity> {
        let mut tx = self.db.begin().await?;
        let result = self.components.entities.get(&mut tx, id, version).await;
        finish(tx, result).await
    }

    /// Updates an entity; the request's eTag must be current.
    pub async fn update_entity(&self, ctx: &RequestContext, req: EntityUpdate) -> AppResult<VersionedEntity> {
        let mut tx = self.db.begin().await?;
        let result = self.components.entities.update(&mut tx, ctx, req).await;
        finish(tx, result).await
    }

    /// Snapshots a new current revision.
    pub async fn create_new_version(
        &self,
        ctx: &RequestContext,
        req: NewVersion,
    ) -> AppResult<VersionedEntity> {
        let mut tx = self.db.begin().await?;
        let result = self
            .components
            .entities
            .create_new_version(&mut tx, ctx, req)
            .await;
        finish(tx, result).await
    }

    /// Deletes an entity and everything beneath it.
    pub async fn delete_entity(&self, ctx: &RequestContext, id: EntityId) -> AppResult<usize> {
        let mut tx = self.db.begin().await?;
        let result = self.components.entities.delete(&mut tx, ctx, id).await;
        finish(tx, result).await
    }

    /// Deletes one revision, rolling the current pointer back if needed.
    pub async fn delete_version(
        &self,
        ctx: &RequestContext,
        id: EntityId,
        version_number: i64,
    ) -> AppResult<VersionedEntity> {
        let mut tx = self.db.begin().await?;
        let result = self
            .components
            .entities
            .delete_version(&mut tx, ctx, id, version_number)
            .await;
        finish(tx, result).await
    }

    /// Moves an entity under a new parent.
    pub async fn move_entity(
        &self,
        ctx: &RequestContext,
        id: EntityId,
        new_parent_id: EntityId,
        etag: &str,
    ) -> AppResult<VersionedEntity> {
        let mut tx = self.db.begin().await?;
        let result = self
            .components
            .entities
            .move_entity(&mut tx, ctx, id, new_parent_id, etag)
            .await;
        finish(tx, result).await
    }

    /// Headers from the root down to `id`.
    pub async fn get_entity_path(&self, id: EntityId) -> AppResult<Vec<EntityHeader>> {
        let mut tx = self.db.begin().await?;
        let result = self.components.entities.get_path(&mut tx, id).await;
        finish(tx, result).await
    }

    /// Direct children, ascending by id.
    pub async fn get_children(&self, parent_id: EntityId) -> AppResult<Vec<EntityHeader>> {
        let mut tx = self.db.begin().await?;
        let result = self.components.entities.get_children(&mut tx, parent_id).await;
        finish(tx, result).await
    }

    /// Looks up an entity by alias under `parent_id`.
    pub async fn get_entity_by_alias(
        &self,
        parent_id: Option<EntityId>,
        alias: &str,
    ) -> AppResult<Entity> {
        let mut tx = self.db.begin().await?;
        let result = self
            .components
            .entities
            .get_by_alias(&mut tx, parent_id, alias)
            .await;
        finish(tx, result).await
    }

    /// Looks up an entity by name under `parent_id`.
    pub async fn get_child_by_name(
        &self,
        parent_id: Option<EntityId>,
        name: &str,
    ) -> AppResult<Entity> {
        let mut tx = self.db.begin().await?;
        let result = self
            .components
            .entities
            .get_child_by_name(&mut tx, parent_id, name)
            .await;
        finish(tx, result).await
    }

    /// All revisions, newest first.
    pub async fn list_versions(&self, id: EntityId) -> AppResult<Vec<Revision>> {
        let mut tx = self.db.begin().await?;
        let result = self.components.entities.list_versions(&mut tx, id).await;
        finish(tx, result).await
    }

    /// All version numbers, newest first.
    pub async fn get_version_numbers(&self, id: EntityId) -> AppResult<Vec<i64>> {
        let mut tx = self.db.begin().await?;
        let result = self
            .components
            .entities
            .get_version_numbers(&mut tx, id)
            .await;
        finish(tx, result).await
    }

    // Access control

    /// The entity whose ACL governs `id`.
    pub async fn get_benefactor(&self, id: EntityId) -> AppResult<EntityId> {
        let mut tx = self.db.begin().await?;
        let result = self
            .components
            .checker
            .resolver()
            .get_benefactor(&mut tx, id)
            .await;
        finish(tx, result).await
    }

    /// Whether any principal holds `access` on `resource_id`.
    pub async fn can_access(
        &self,
        principal_ids: &BTreeSet<PrincipalId>,
        resource_id: EntityId,
        access: AccessType,
    ) -> AppResult<bool> {
        let mut tx = self.db.begin().await?;
        let result = self
            .components
            .checker
            .can_access(&mut tx, principal_ids, resource_id, access)
            .await;
        finish(tx, result).await
    }

    /// The benefactors among `benefactor_ids` granting `access`.
    pub async fn get_accessible_benefactors(
        &self,
        principal_ids: &BTreeSet<PrincipalId>,
        benefactor_ids: &BTreeSet<EntityId>,
        access: AccessType,
    ) -> AppResult<BTreeSet<EntityId>> {
        let mut tx = self.db.begin().await?;
        let result = self
            .components
            .checker
            .get_accessible_benefactors(&mut tx, principal_ids, benefactor_ids, access)
            .await;
        finish(tx, result).await
    }

    /// Children of `parent_id` the principals cannot read.
    pub async fn get_non_visible_children(
        &self,
        principal_ids: &BTreeSet<PrincipalId>,
        parent_id: EntityId,
    ) -> AppResult<BTreeSet<EntityId>> {
        let mut tx = self.db.begin().await?;
        let result = self
            .components
            .checker
            .get_non_visible_children(&mut tx, principal_ids, parent_id)
            .await;
        finish(tx, result).await
    }

    /// Principals granted `access` by the ACL of `resource_id`.
    pub async fn get_principal_ids(
        &self,
        resource_id: EntityId,
        access: AccessType,
    ) -> AppResult<BTreeSet<PrincipalId>> {
        let mut tx = self.db.begin().await?;
        let result = self
            .components
            .checker
            .get_principal_ids(&mut tx, resource_id, access)
            .await;
        finish(tx, result).await
    }

    /// Creates the ACL of `resource_id`.
    pub async fn create_acl(
        &self,
        ctx: &RequestContext,
        resource_id: EntityId,
        resource_access: Vec<ResourceAccess>,
    ) -> AppResult<AccessControlList> {
        let mut tx = self.db.begin().await?;
        let result = self
            .components
            .acls
            .create(&mut tx, ctx, resource_id, resource_access)
            .await;
        finish(tx, result).await
    }

    /// Reads the ACL of `resource_id`.
    pub async fn get_acl(&self, resource_id: EntityId) -> AppResult<AccessControlList> {
        let mut tx = self.db.begin().await?;
        let result = self.components.acls.get(&mut tx, resource_id).await;
        finish(tx, result).await
    }

    /// Replaces the grants of an ACL; its eTag must be current.
    pub async fn update_acl(
        &self,
        ctx: &RequestContext,
        acl: AccessControlList,
    ) -> AppResult<AccessControlList> {
        let mut tx = self.db.begin().await?;
        let result = self.components.acls.update(&mut tx, ctx, acl).await;
        finish(tx, result).await
    }

    /// Deletes the ACL of `resource_id`.
    pub async fn delete_acl(&self, ctx: &RequestContext, resource_id: EntityId) -> AppResult<bool> {
        let mut tx = self.db.begin().await?;
        let result = self.components.acls.delete(&mut tx, ctx, resource_id).await;
        finish(tx, result).await
    }

    // Change log

    /// Records one change.
    pub async fn append_change(
        &self,
        object_id: i64,
        object_type: ObjectType,
        change_type: ChangeType,
        object_etag: Option<String>,
    ) -> AppResult<ChangeRecord> {
        let mut tx = self.db.begin().await?;
        let result = self
            .components
            .changes
            .append(&mut tx, object_id, object_type, change_type, object_etag)
            .await;
        finish(tx, result).await
    }

    /// Records a batch in canonical order.
    pub async fn append_changes(&self, batch: Vec<ChangeRecord>) -> AppResult<Vec<ChangeRecord>> {
        let mut tx = self.db.begin().await?;
        let result = self.components.changes.append_batch(&mut tx, batch).await;
        finish(tx, result).await
    }

    /// Changes numbered after `after`, ascending.
    pub async fn list_changes(
        &self,
        after: i64,
        object_type: Option<ObjectType>,
        limit: i64,
    ) -> AppResult<Vec<ChangeRecord>> {
        let mut tx = self.db.begin().await?;
        let result = self
            .components
            .changes
            .list(&mut tx, after, object_type, limit)
            .await;
        finish(tx, result).await
    }

    /// Removes the change row of one object.
    pub async fn delete_change(&self, object_id: i64, object_type: ObjectType) -> AppResult<bool> {
        let mut tx = self.db.begin().await?;
        let result = self
            .components
            .changes
            .delete(&mut tx, object_id, object_type)
            .await;
        finish(tx, result).await
    }

    /// Administrative purge of the whole change log.
    pub async fn purge_changes(&self) -> AppResult<u64> {
        let mut tx = self.db.begin().await?;
        let result = self.components.changes.purge_all(&mut tx).await;
        finish(tx, result).await
    }

    /// Smallest change number present.
    pub async fn minimum_change_number(&self) -> AppResult<Option<i64>> {
        let mut tx = self.db.begin().await?;
        let result = self.components.changes.minimum_change_number(&mut tx).await;
        finish(tx, result).await
    }

    /// Largest change number present.
    pub async fn current_change_number(&self) -> AppResult<Option<i64>> {
        let mut tx = self.db.begin().await?;
        let result = self.components.changes.current_change_number(&mut tx).await;
        finish(tx, result).await
    }

    /// Number of change rows.
    pub async fn change_count(&self) -> AppResult<i64> {
        let mut tx = self.db.begin().await?;
        let result = self.components.changes.count(&mut tx).await;
        finish(tx, result).await
    }

    /// eTag recorded for an object's latest change.
    pub async fn get_change_etag(
        &self,
        object_id: i64,
        object_type: ObjectType,
    ) -> AppResult<Option<String>> {
        let mut tx = self.db.begin().await?;
        let result = self
            .components
            .changes
            .get_etag(&mut tx, object_id, object_type)
            .await;
        finish(tx, result).await
    }

    /// Records delivery of changes.
    pub async fn register_sent(&self, changes: &[ChangeRecord]) -> AppResult<()> {
        let mut tx = self.db.begin().await?;
        let result = self.components.changes.register_sent(&mut tx, changes).await;
        finish(tx, result).await
    }

    /// Changes not yet delivered in their current form.
    pub async fn list_unsent(&self, limit: i64) -> AppResult<Vec<ChangeRecord>> {
        let mut tx = self.db.begin().await?;
        let result = self.components.changes.list_unsent(&mut tx, limit).await;
        finish(tx, result).await
    }

    // Concurrency

    /// Locks entities in ascending order and returns their eTags.
    ///
    /// The locks are released when this call's transaction ends; use
    /// [`Self::with_transaction`] to hold them across further operations.
    pub async fn lock_entities(&self, ids: &[EntityId]) -> AppResult<Vec<EntityLock>> {
        let mut tx = self.db.begin().await?;
        let result = self.components.controller.lock_entities(&mut tx, ids).await;
        finish(tx, result).await
    }

    /// Reads an entity's eTag without locking.
    pub async fn peek_etag(&self, id: EntityId) -> AppResult<String> {
        let mut tx = self.db.begin().await?;
        let result = self.components.controller.peek_etag(&mut tx, id).await;
        finish(tx, result).await
    }
}

/// Commit on success; roll back on failure and return the original error.
async fn finish<T: CatalogTx, R>(tx: T, result: AppResult<R>) -> AppResult<R> {
    match result {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(e) => {
            if e.is_retryable() {
                warn!(error = %e, "Lock wait timed out; transaction rolled back");
            }
            if let Err(rollback_err) = tx.rollback().await {
                warn!(error = %rollback_err, "Rollback failed");
            }
            Err(e)
        }
    }
}
