//! ACL table operations.

use std::collections::BTreeSet;

use async_trait::async_trait;

use catalog_core::result::AppResult;
use catalog_core::types::{EntityId, PrincipalId};
use catalog_entity::{AccessControlList, AccessType};

/// Row operations on access-control lists and their grants.
#[async_trait]
pub trait AclRows: Send {
    /// Insert an ACL with its grants. An existing ACL is a `Conflict`.
    async fn insert_acl(&mut self, acl: &AccessControlList) -> AppResult<()>;

    /// Read an ACL with its grants.
    async fn find_acl(&mut self, resource_id: EntityId) -> AppResult<Option<AccessControlList>>;

    /// Take the exclusive row lock on an ACL and return its eTag.
    async fn lock_acl(&mut self, resource_id: EntityId) -> AppResult<Option<String>>;

    /// Overwrite an ACL, replacing all of its grants.
    async fn update_acl(&mut self, acl: &AccessControlList) -> AppResult<()>;

    /// Delete an ACL. Returns whether a row was removed.
    async fn delete_acl(&mut self, resource_id: EntityId) -> AppResult<bool>;

    /// The subset of `benefactor_ids` whose ACL grants `access` to any of
    /// `principal_ids`.
    async fn benefactors_granting(
        &mut self,
        principal_ids: &BTreeSet<PrincipalId>,
        benefactor_ids: &BTreeSet<EntityId>,
        access: AccessType,
    ) -> AppResult<BTreeSet<EntityId>>;

    /// Children of `parent_id` that own an ACL granting `access` to none of
    /// `principal_ids`.
    async fn children_denying(
        &mut self,
        parent_id: EntityId,
        principal_ids: &BTreeSet<PrincipalId>,
        access: AccessType,
    ) -> AppResult<BTreeSet<EntityId>>;
}
