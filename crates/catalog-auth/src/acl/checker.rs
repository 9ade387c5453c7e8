//! Access checks against the benefactor's ACL.
//!
//! Group-membership closure is the caller's job: every method takes the full
//! set of principal ids (the user plus all of its groups).

use std::collections::BTreeSet;

use tracing::debug;

use catalog_core::error::AppError;
use catalog_core::result::AppResult;
use catalog_core::types::{EntityId, PrincipalId};
use catalog_database::{AclRows, EntityRows};
use catalog_entity::AccessType;

use super::benefactor::BenefactorResolver;

/// Evaluates inherited ACLs.
#[derive(Debug, Clone, Copy)]
pub struct AccessChecker {
    resolver: BenefactorResolver,
}

impl AccessChecker {
    /// Create a checker that resolves benefactors with `resolver`.
    pub fn new(resolver: BenefactorResolver) -> Self {
        Self { resolver }
    }

    /// The benefactor resolver in use.
    pub fn resolver(&self) -> &BenefactorResolver {
        &self.resolver
    }

    /// Whether any of `principal_ids` holds `access` on `resource_id`.
    ///
    /// A resource whose benefactor is a root without an ACL grants nothing.
    pub async fn can_access<T>(
        &self,
        tx: &mut T,
        principal_ids: &BTreeSet<PrincipalId>,
        resource_id: EntityId,
        access: AccessType,
    ) -> AppResult<bool>
    where
        T: EntityRows + AclRows + ?Sized,
    {
        let benefactor = self.resolver.get_benefactor(tx, resource_id).await?;
        if principal_ids.is_empty() {
            return Ok(false);
        }

        let granted = match tx.find_acl(benefactor).await? {
            Some(acl) => acl.grants(principal_ids, access),
            None => false,
        };
        debug!(
            resource_id = %resource_id,
            benefactor = %benefactor,
            access = %access,
            granted,
            "Evaluated access"
        );
        Ok(granted)
    }

    /// The subset of `benefactor_ids` granting `access` to any principal.
    ///
    /// Either input being empty short-circuits to an empty result.
    pub async fn get_accessible_benefactors<T>(
        &self,
        tx: &mut T,
        principal_ids: &BTreeSet<PrincipalId>,
        benefactor_ids: &BTreeSet<EntityId>,
        access: AccessType,
    ) -> AppResult<BTreeSet<EntityId>>
    where
        T: AclRows + ?Sized,
    {
        if principal_ids.is_empty() || benefactor_ids.is_empty() {
            return Ok(BTreeSet::new());
        }
        tx.benefactors_granting(principal_ids, benefactor_ids, access)
            .await
    }

    /// Children of `parent_id` that the principals cannot read.
    ///
    /// A child that inherits its ACL is visible because the caller already
    /// holds access to the parent; only children owning an ACL that denies
    /// READ to every principal are reported.
    pub async fn get_non_visible_children<T>(
        &self,
        tx: &mut T,
        principal_ids: &BTreeSet<PrincipalId>,
        parent_id: EntityId,
    ) -> AppResult<BTreeSet<EntityId>>
    where
        T: AclRows + ?Sized,
    {
        if principal_ids.is_empty() {
            return Err(AppError::validation("At least one principal id is required"));
        }
        tx.children_denying(parent_id, principal_ids, AccessType::Read)
            .await
    }

    /// Principals granted `access` directly by the ACL of `resource_id`.
    pub async fn get_principal_ids<T>(
        &self,
        tx: &mut T,
        resource_id: EntityId,
        access: AccessType,
    ) -> AppResult<BTreeSet<PrincipalId>>
    where
        T: AclRows + ?Sized,
    {
        Ok(tx
            .find_acl(resource_id)
            .await?
            .map(|acl| acl.principals_with(access))
            .unwrap_or_default())
    }
}
