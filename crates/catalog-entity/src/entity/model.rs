//! Entity row models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use catalog_core::types::{EntityId, PrincipalId};

use super::entity_type::EntityType;
use crate::revision::Revision;

/// A node in the entity tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Entity {
    /// Immutable, system-generated identifier.
    pub id: EntityId,
    /// Parent entity (None for a root).
    pub parent_id: Option<EntityId>,
    /// Name, unique among siblings.
    pub name: String,
    /// Optional alias, unique among siblings.
    pub alias: Option<String>,
    /// Kind of entity.
    pub entity_type: EntityType,
    /// Version number of the current revision.
    pub current_version: i64,
    /// Highest version number ever issued. Deleting a revision never
    /// lowers it, so numbers are not reused.
    pub max_version: i64,
    /// Optimistic-concurrency token, replaced on every mutation.
    pub etag: String,
    /// Principal that created the entity.
    pub created_by: PrincipalId,
    /// Creation time.
    pub created_on: DateTime<Utc>,
    /// Principal that last modified the entity.
    pub modified_by: PrincipalId,
    /// Last modification time.
    pub modified_on: DateTime<Utc>,
}

impl Entity {
    /// Check if this is a root entity (no parent).
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// An entity joined with one of its revisions.
///
/// This is what callers read and hand back for updates: the tree fields
/// come from the entity row, the content metadata from the revision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionedEntity {
    /// The entity row.
    #[serde(flatten)]
    pub entity: Entity,
    /// The selected revision (the current one unless a version was requested).
    pub revision: Revision,
}

impl VersionedEntity {
    /// The entity identifier.
    pub fn id(&self) -> EntityId {
        self.entity.id
    }

    /// The version number of the attached revision.
    pub fn version_number(&self) -> i64 {
        self.revision.version_number
    }

    /// Whether the attached revision is the entity's current one.
    pub fn is_current(&self) -> bool {
        self.revision.version_number == self.entity.current_version
    }
}

/// Lightweight projection used for paths and child listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct EntityHeader {
    /// Entity identifier.
    pub id: EntityId,
    /// Parent identifier.
    pub parent_id: Option<EntityId>,
    /// Entity name.
    pub name: String,
    /// Kind of entity.
    pub entity_type: EntityType,
    /// Current version number.
    pub current_version: i64,
}

impl From<&Entity> for EntityHeader {
    fn from(entity: &Entity) -> Self {
        Self {
            id: entity.id,
            parent_id: entity.parent_id,
            name: entity.name.clone(),
            entity_type: entity.entity_type,
            current_version: entity.current_version,
        }
    }
}
