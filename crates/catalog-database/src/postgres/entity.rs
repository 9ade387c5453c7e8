//! Entity rows on PostgreSQL.

use async_trait::async_trait;

use catalog_core::AppError;
use catalog_core::result::AppResult;
use catalog_core::types::EntityId;
use catalog_entity::{Entity, EntityHeader, LineageLink};

use super::PgTx;
use super::error::db_error;
use crate::store::EntityRows;

const ENTITY_COLUMNS: &str = "id, parent_id, name, alias, entity_type, current_version, max_version, etag, \
     created_by, created_on, modified_by, modified_on";

#[async_trait]
impl EntityRows for PgTx {
    async fn next_entity_id(&mut self) -> AppResult<EntityId> {
        sqlx::query_scalar::<_, EntityId>("SELECT nextval('entity_id_seq')")
            .fetch_one(&mut *self.tx)
            .await
            .map_err(|e| db_error("Failed to allocate entity id", e))
    }

    async fn insert_entity(&mut self, entity: &Entity) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO entities (id, parent_id, name, alias, entity_type, current_version, \
             max_version, etag, created_by, created_on, modified_by, modified_on) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
        )
        .bind(entity.id)
        .bind(entity.parent_id)
        .bind(&entity.name)
        .bind(&entity.alias)
        .bind(entity.entity_type)
        .bind(entity.current_version)
        .bind(entity.max_version)
        .bind(&entity.etag)
        .bind(entity.created_by)
        .bind(entity.created_on)
        .bind(entity.modified_by)
        .bind(entity.modified_on)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| db_error("Failed to insert entity", e))?;
        Ok(())
    }

    async fn find_entity(&mut self, id: EntityId) -> AppResult<Option<Entity>> {
        sqlx::query_as::<_, Entity>(&format!("SELECT {ENTITY_COLUMNS} FROM entities WHERE id = $1"))
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| db_error("Failed to find entity", e))
    }

    async fn lock_entity(&mut self, id: EntityId) -> AppResult<Option<String>> {
        sqlx::query_scalar::<_, String>("SELECT etag FROM entities WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| db_error("Failed to lock entity", e))
    }

    async fn peek_entity_etag(&mut self, id: EntityId) -> AppResult<Option<String>> {
        sqlx::query_scalar::<_, String>("SELECT etag FROM entities WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| db_error("Failed to read entity etag", e))
    }

    async fn update_entity(&mut self, entity: &Entity) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE entities SET parent_id = $2, name = $3, alias = $4, current_version = $5, \
             max_version = $6, etag = $7, modified_by = $8, modified_on = $9 WHERE id = $1",
        )
        .bind(entity.id)
        .bind(entity.parent_id)
        .bind(&entity.name)
        .bind(&entity.alias)
        .bind(entity.current_version)
        .bind(entity.max_version)
        .bind(&entity.etag)
        .bind(entity.modified_by)
        .bind(entity.modified_on)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| db_error("Failed to update entity", e))?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!(
                "Entity {} not found",
                entity.id
            )));
        }
        Ok(())
    }

    async fn delete_entity(&mut self, id: EntityId) -> AppResult<bool> {
        // Revisions and the ACL go with the row through ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM entities WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| db_error("Failed to delete entity", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_child_by_name(
        &mut self,
        parent_id: Option<EntityId>,
        name: &str,
    ) -> AppResult<Option<Entity>> {
        sqlx::query_as::<_, Entity>(&format!(
            "SELECT {ENTITY_COLUMNS} FROM entities \
             WHERE parent_id IS NOT DISTINCT FROM $1 AND name = $2"
        ))
        .bind(parent_id)
        .bind(name)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| db_error("Failed to find child by name", e))
    }

    async fn find_child_by_alias(
        &mut self,
        parent_id: Option<EntityId>,
        alias: &str,
    ) -> AppResult<Option<Entity>> {
        sqlx::query_as::<_, Entity>(&format!(
            "SELECT {ENTITY_COLUMNS} FROM entities \
             WHERE parent_id IS NOT DISTINCT FROM $1 AND alias = $2"
        ))
        .bind(parent_id)
        .bind(alias)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| db_error("Failed to find child by alias", e))
    }

    async fn list_children(&mut self, parent_id: EntityId) -> AppResult<Vec<EntityHeader>> {
        sqlx::query_as::<_, EntityHeader>(
            "SELECT id, parent_id, name, entity_type, current_version FROM entities \
             WHERE parent_id = $1 ORDER BY id ASC",
        )
        .bind(parent_id)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| db_error("Failed to list children", e))
    }

    async fn lineage(&mut self, id: EntityId, max_links: usize) -> AppResult<Vec<LineageLink>> {
        let max_links = i64::try_from(max_links).unwrap_or(i64::MAX);
        // UNION ALL keeps repeated ids so a cycle is visible to the caller;
        // the depth bound guarantees the recursion ends.
        sqlx::query_as::<_, LineageLink>(
            "WITH RECURSIVE chain (id, parent_id, depth) AS ( \
                SELECT e.id, e.parent_id, 1::BIGINT FROM entities e WHERE e.id = $1 \
                UNION ALL \
                SELECT p.id, p.parent_id, c.depth + 1 FROM entities p \
                JOIN chain c ON p.id = c.parent_id \
                WHERE c.depth < $2 \
             ) \
             SELECT c.id, c.parent_id, \
                    EXISTS (SELECT 1 FROM acls a WHERE a.resource_id = c.id) AS has_acl \
             FROM chain c ORDER BY c.depth ASC",
        )
        .bind(id)
        .bind(max_links)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| db_error("Failed to read lineage", e))
    }
}
