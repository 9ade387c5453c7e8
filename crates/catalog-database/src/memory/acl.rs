//! ACL rows in memory.

use std::collections::BTreeSet;

use async_trait::async_trait;

use catalog_core::AppError;
use catalog_core::result::AppResult;
use catalog_core::types::{EntityId, PrincipalId};
use catalog_entity::{AccessControlList, AccessType};

use super::locks::LockKey;
use super::tx::MemoryTx;
use crate::store::AclRows;

#[async_trait]
impl AclRows for MemoryTx {
    async fn insert_acl(&mut self, acl: &AccessControlList) -> AppResult<()> {
        self.acquire(LockKey::Acl(acl.resource_id)).await?;
        self.view(|v| {
            if v.entity(acl.resource_id).is_none() {
                return Err(AppError::conflict(format!(
                    "Entity {} no longer exists",
                    acl.resource_id
                )));
            }
            if v.acl(acl.resource_id).is_some() {
                return Err(AppError::conflict(format!(
                    "Entity {} already has an ACL",
                    acl.resource_id
                )));
            }
            Ok(())
        })??;
        self.writes.acls.insert(acl.resource_id, Some(acl.clone()));
        Ok(())
    }

    async fn find_acl(&mut self, resource_id: EntityId) -> AppResult<Option<AccessControlList>> {
        self.view(|v| v.acl(resource_id).cloned())
    }

    async fn lock_acl(&mut self, resource_id: EntityId) -> AppResult<Option<String>> {
        self.acquire(LockKey::Acl(resource_id)).await?;
        self.view(|v| v.acl(resource_id).map(|a| a.etag.clone()))
    }

    async fn update_acl(&mut self, acl: &AccessControlList) -> AppResult<()> {
        self.acquire(LockKey::Acl(acl.resource_id)).await?;
        let exists = self.view(|v| v.acl(acl.resource_id).is_some())?;
        if !exists {
            return Err(AppError::not_found(format!(
                "ACL for {} not found",
                acl.resource_id
            )));
        }
        self.writes.acls.insert(acl.resource_id, Some(acl.clone()));
        Ok(())
    }

    async fn delete_acl(&mut self, resource_id: EntityId) -> AppResult<bool> {
        self.acquire(LockKey::Acl(resource_id)).await?;
        let existed = self.view(|v| v.acl(resource_id).is_some())?;
        if existed {
            self.writes.acls.insert(resource_id, None);
        }
        Ok(existed)
    }

    async fn benefactors_granting(
        &mut self,
        principal_ids: &BTreeSet<PrincipalId>,
        benefactor_ids: &BTreeSet<EntityId>,
        access: AccessType,
    ) -> AppResult<BTreeSet<EntityId>> {
        self.view(|v| {
            benefactor_ids
                .iter()
                .copied()
                .filter(|id| {
                    v.acl(*id)
                        .is_some_and(|acl| acl.grants(principal_ids, access))
                })
                .collect()
        })
    }

    async fn children_denying(
        &mut self,
        parent_id: EntityId,
        principal_ids: &BTreeSet<PrincipalId>,
        access: AccessType,
    ) -> AppResult<BTreeSet<EntityId>> {
        self.view(|v| {
            v.children(parent_id)
                .into_iter()
                .filter(|child| {
                    v.acl(child.id)
                        .is_some_and(|acl| !acl.grants(principal_ids, access))
                })
                .map(|child| child.id)
                .collect()
        })
    }
}
