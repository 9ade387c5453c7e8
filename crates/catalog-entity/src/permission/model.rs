//! ACL models.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use catalog_core::error::AppError;
use catalog_core::types::{EntityId, PrincipalId};

use super::access::AccessType;

/// The grants held by one principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceAccess {
    /// Grantee.
    pub principal_id: PrincipalId,
    /// Granted access types.
    pub access_types: BTreeSet<AccessType>,
}

impl ResourceAccess {
    /// Create a grant.
    pub fn new(principal_id: PrincipalId, access_types: impl IntoIterator<Item = AccessType>) -> Self {
        Self {
            principal_id,
            access_types: access_types.into_iter().collect(),
        }
    }
}

/// The access-control list owned by a resource.
///
/// Presence of an ACL makes its resource the benefactor of itself and
/// every descendant that does not own one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct AccessControlList {
    /// Owning entity.
    pub resource_id: EntityId,
    /// Optimistic-concurrency token.
    pub etag: String,
    /// Principal that created the ACL.
    pub created_by: PrincipalId,
    /// Creation time.
    pub created_on: DateTime<Utc>,
    /// Last modification time.
    pub modified_on: DateTime<Utc>,
    /// Grants; loaded separately from the access rows.
    #[sqlx(skip)]
    #[serde(default)]
    pub resource_access: Vec<ResourceAccess>,
}

impl AccessControlList {
    /// Whether any of `principals` is granted `access`.
    pub fn grants(&self, principals: &BTreeSet<PrincipalId>, access: AccessType) -> bool {
        self.resource_access
            .iter()
            .any(|ra| principals.contains(&ra.principal_id) && ra.access_types.contains(&access))
    }

    /// Principals granted `access`, ascending.
    pub fn principals_with(&self, access: AccessType) -> BTreeSet<PrincipalId> {
        self.resource_access
            .iter()
            .filter(|ra| ra.access_types.contains(&access))
            .map(|ra| ra.principal_id)
            .collect()
    }

    /// Merge duplicate principal entries and sort by principal.
    pub fn normalize(&mut self) {
        let mut merged: Vec<ResourceAccess> = Vec::with_capacity(self.resource_access.len());
        let mut entries = std::mem::take(&mut self.resource_access);
        entries.sort_by_key(|ra| ra.principal_id);
        for ra in entries {
            match merged.last_mut() {
                Some(last) if last.principal_id == ra.principal_id => {
                    last.access_types.extend(ra.access_types);
                }
                _ => merged.push(ra),
            }
        }
        self.resource_access = merged;
    }

    /// Every entry must grant at least one access type.
    pub fn validate(&self) -> Result<(), AppError> {
        if let Some(empty) = self.resource_access.iter().find(|ra| ra.access_types.is_empty()) {
            return Err(AppError::validation(format!(
                "ACL on {} grants no access to principal {}",
                self.resource_id, empty.principal_id
            )));
        }
        Ok(())
    }
}
