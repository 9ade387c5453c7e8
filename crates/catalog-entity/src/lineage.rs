//! Parent-pointer snapshot rows used by benefactor resolution.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use catalog_core::types::EntityId;

/// One link of an entity's ancestor chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct LineageLink {
    /// Entity on the chain.
    pub id: EntityId,
    /// Its parent, None for a root.
    pub parent_id: Option<EntityId>,
    /// Whether the entity owns an ACL.
    pub has_acl: bool,
}

impl LineageLink {
    /// Create a link.
    pub fn new(id: EntityId, parent_id: Option<EntityId>, has_acl: bool) -> Self {
        Self {
            id,
            parent_id,
            has_acl,
        }
    }
}
