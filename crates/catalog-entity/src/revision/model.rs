//! Revision row model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use catalog_core::types::{EntityId, PrincipalId};

use crate::entity::annotation::Annotations;

/// One version of an entity, keyed by `(entity_id, version_number)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Revision {
    /// Owning entity.
    pub entity_id: EntityId,
    /// 1-based, monotonic per entity.
    pub version_number: i64,
    /// Label, unique per entity.
    pub label: String,
    /// Free-text comment.
    pub comment: Option<String>,
    /// Reference into external content storage.
    pub content_reference: Option<String>,
    /// Typed annotations.
    #[sqlx(json)]
    pub annotations: Annotations,
    /// eTag of the entity when this revision was last written.
    pub etag: String,
    /// Principal that wrote the revision.
    pub modified_by: PrincipalId,
    /// Time the revision was written.
    pub modified_on: DateTime<Utc>,
}

impl Revision {
    /// Label assigned to a version when the caller gives none.
    pub fn default_label(version_number: i64) -> String {
        version_number.to_string()
    }
}
