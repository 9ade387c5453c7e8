//! Revision table operations.

use async_trait::async_trait;

use catalog_core::result::AppResult;
use catalog_core::types::EntityId;
use catalog_entity::Revision;

/// Row operations on entity revisions.
///
/// Revision writes happen under the owning entity's row lock.
#[async_trait]
pub trait RevisionRows: Send {
    /// Insert a revision. A label already used by the entity is a `Conflict`.
    async fn insert_revision(&mut self, revision: &Revision) -> AppResult<()>;

    /// Read one revision.
    async fn find_revision(
        &mut self,
        entity_id: EntityId,
        version_number: i64,
    ) -> AppResult<Option<Revision>>;

    /// Find a revision by label.
    async fn find_revision_by_label(
        &mut self,
        entity_id: EntityId,
        label: &str,
    ) -> AppResult<Option<Revision>>;

    /// Overwrite an existing revision.
    async fn update_revision(&mut self, revision: &Revision) -> AppResult<()>;

    /// Delete one revision. Returns whether a row was removed.
    async fn delete_revision(&mut self, entity_id: EntityId, version_number: i64) -> AppResult<bool>;

    /// All revisions of an entity, newest first.
    async fn list_revisions(&mut self, entity_id: EntityId) -> AppResult<Vec<Revision>>;
}
