//! Entity table operations.

use async_trait::async_trait;

use catalog_core::result::AppResult;
use catalog_core::types::EntityId;
use catalog_entity::{Entity, EntityHeader, LineageLink};

/// Row operations on the entity tree.
#[async_trait]
pub trait EntityRows: Send {
    /// Allocate a fresh entity identifier.
    async fn next_entity_id(&mut self) -> AppResult<EntityId>;

    /// Insert a new entity row.
    ///
    /// Fails with `NameConflict` when a sibling already uses the name or alias.
    async fn insert_entity(&mut self, entity: &Entity) -> AppResult<()>;

    /// Read an entity row without locking it.
    async fn find_entity(&mut self, id: EntityId) -> AppResult<Option<Entity>>;

    /// Take the exclusive row lock on an entity and return its eTag.
    ///
    /// Blocks until the lock is available or the lock timeout elapses
    /// (`LockTimeout`). The lock is held until the transaction ends.
    async fn lock_entity(&mut self, id: EntityId) -> AppResult<Option<String>>;

    /// Read an entity's eTag without locking.
    async fn peek_entity_etag(&mut self, id: EntityId) -> AppResult<Option<String>>;

    /// Overwrite an existing entity row.
    async fn update_entity(&mut self, entity: &Entity) -> AppResult<()>;

    /// Delete an entity row together with its revisions and ACL.
    ///
    /// Children must already be gone. Returns whether a row was removed.
    async fn delete_entity(&mut self, id: EntityId) -> AppResult<bool>;

    /// Find a child of `parent_id` (None for roots) by name.
    async fn find_child_by_name(
        &mut self,
        parent_id: Option<EntityId>,
        name: &str,
    ) -> AppResult<Option<Entity>>;

    /// Find a child of `parent_id` (None for roots) by alias.
    async fn find_child_by_alias(
        &mut self,
        parent_id: Option<EntityId>,
        alias: &str,
    ) -> AppResult<Option<Entity>>;

    /// Direct children of an entity, ascending by id.
    async fn list_children(&mut self, parent_id: EntityId) -> AppResult<Vec<EntityHeader>>;

    /// Snapshot of the parent chain starting at `id`.
    ///
    /// The first link is `id` itself (empty when it does not exist). The walk
    /// follows parent pointers and stops at a root, at a dangling parent, or
    /// after `max_links` links, whichever comes first. Repeated ids are
    /// returned as found so the caller can detect cycles.
    async fn lineage(&mut self, id: EntityId, max_links: usize) -> AppResult<Vec<LineageLink>>;
}
