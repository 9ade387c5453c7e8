//! Revision rows on PostgreSQL.

use async_trait::async_trait;
use sqlx::types::Json;

use catalog_core::AppError;
use catalog_core::result::AppResult;
use catalog_core::types::EntityId;
use catalog_entity::Revision;

use super::PgTx;
use super::error::db_error;
use crate::store::RevisionRows;

const REVISION_COLUMNS: &str = "entity_id, version_number, label, comment, content_reference, \
     annotations, etag, modified_by, modified_on";

#[async_trait]
impl RevisionRows for PgTx {
    async fn insert_revision(&mut self, revision: &Revision) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO revisions (entity_id, version_number, label, comment, content_reference, \
             annotations, etag, modified_by, modified_on) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(revision.entity_id)
        .bind(revision.version_number)
        .bind(&revision.label)
        .bind(&revision.comment)
        .bind(&revision.content_reference)
        .bind(Json(&revision.annotations))
        .bind(&revision.etag)
        .bind(revision.modified_by)
        .bind(revision.modified_on)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| db_error("Failed to insert revision", e))?;
        Ok(())
    }

    async fn find_revision(
        &mut self,
        entity_id: EntityId,
        version_number: i64,
    ) -> AppResult<Option<Revision>> {
        sqlx::query_as::<_, Revision>(&format!(
            "SELECT {REVISION_COLUMNS} FROM revisions WHERE entity_id = $1 AND version_number = $2"
        ))
        .bind(entity_id)
        .bind(version_number)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| db_error("Failed to find revision", e))
    }

    async fn find_revision_by_label(
        &mut self,
        entity_id: EntityId,
        label: &str,
    ) -> AppResult<Option<Revision>> {
        sqlx::query_as::<_, Revision>(&format!(
            "SELECT {REVISION_COLUMNS} FROM revisions WHERE entity_id = $1 AND label = $2"
        ))
        .bind(entity_id)
        .bind(label)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| db_error("Failed to find revision by label", e))
    }

    async fn update_revision(&mut self, revision: &Revision) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE revisions SET label = $3, comment = $4, content_reference = $5, \
             annotations = $6, etag = $7, modified_by = $8, modified_on = $9 \
             WHERE entity_id = $1 AND version_number = $2",
        )
        .bind(revision.entity_id)
        .bind(revision.version_number)
        .bind(&revision.label)
        .bind(&revision.comment)
        .bind(&revision.content_reference)
        .bind(Json(&revision.annotations))
        .bind(&revision.etag)
        .bind(revision.modified_by)
        .bind(revision.modified_on)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| db_error("Failed to update revision", e))?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!(
                "Version {} of {} not found",
                revision.version_number, revision.entity_id
            )));
        }
        Ok(())
    }

    async fn delete_revision(&mut self, entity_id: EntityId, version_number: i64) -> AppResult<bool> {
        let result =
            sqlx::query("DELETE FROM revisions WHERE entity_id = $1 AND version_number = $2")
                .bind(entity_id)
                .bind(version_number)
                .execute(&mut *self.tx)
                .await
                .map_err(|e| db_error("Failed to delete revision", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_revisions(&mut self, entity_id: EntityId) -> AppResult<Vec<Revision>> {
        sqlx::query_as::<_, Revision>(&format!(
            "SELECT {REVISION_COLUMNS} FROM revisions WHERE entity_id = $1 \
             ORDER BY version_number DESC"
        ))
        .bind(entity_id)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| db_error("Failed to list revisions", e))
    }
}
