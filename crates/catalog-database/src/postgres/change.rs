//! Change-log rows on PostgreSQL.

use async_trait::async_trait;

use catalog_core::result::AppResult;
use catalog_entity::{ChangeRecord, ObjectType};

use super::PgTx;
use super::error::db_error;
use crate::store::ChangeRows;

/// Advisory lock key held while a change number is drawn.
const CHANGE_NUMBER_LOCK: i64 = 0x6368_616e_6765;

const CHANGE_COLUMNS: &str =
    "change_number, object_id, object_type, change_type, object_etag, time_stamp";

#[async_trait]
impl ChangeRows for PgTx {
    async fn upsert_change(&mut self, change: &ChangeRecord) -> AppResult<ChangeRecord> {
        // Numbers are drawn under a transaction-scoped lock, so they commit
        // in the order they were drawn and a reader resuming after an
        // observed number never skips a later commit of a lower one.
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(CHANGE_NUMBER_LOCK)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| db_error("Failed to lock change numbering", e))?;

        sqlx::query_as::<_, ChangeRecord>(&format!(
            "INSERT INTO changes (change_number, object_id, object_type, change_type, object_etag, time_stamp) \
             VALUES (nextval('change_number_seq'), $1, $2, $3, $4, $5) \
             ON CONFLICT (object_id, object_type) DO UPDATE SET \
                change_number = EXCLUDED.change_number, \
                change_type = EXCLUDED.change_type, \
                object_etag = EXCLUDED.object_etag, \
                time_stamp = EXCLUDED.time_stamp \
             RETURNING {CHANGE_COLUMNS}"
        ))
        .bind(change.object_id)
        .bind(change.object_type)
        .bind(change.change_type)
        .bind(&change.object_etag)
        .bind(change.timestamp)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| db_error("Failed to write change", e))
    }

    async fn find_change(
        &mut self,
        object_id: i64,
        object_type: ObjectType,
    ) -> AppResult<Option<ChangeRecord>> {
        sqlx::query_as::<_, ChangeRecord>(&format!(
            "SELECT {CHANGE_COLUMNS} FROM changes WHERE object_id = $1 AND object_type = $2"
        ))
        .bind(object_id)
        .bind(object_type)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| db_error("Failed to find change", e))
    }

    async fn delete_change(&mut self, object_id: i64, object_type: ObjectType) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM changes WHERE object_id = $1 AND object_type = $2")
            .bind(object_id)
            .bind(object_type)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| db_error("Failed to delete change", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_all_changes(&mut self) -> AppResult<u64> {
        sqlx::query("DELETE FROM sent_messages")
            .execute(&mut *self.tx)
            .await
            .map_err(|e| db_error("Failed to purge delivery markers", e))?;
        let result = sqlx::query("DELETE FROM changes")
            .execute(&mut *self.tx)
            .await
            .map_err(|e| db_error("Failed to purge changes", e))?;
        Ok(result.rows_affected())
    }

    async fn list_changes(
        &mut self,
        after: i64,
        object_type: Option<ObjectType>,
        limit: i64,
    ) -> AppResult<Vec<ChangeRecord>> {
        sqlx::query_as::<_, ChangeRecord>(&format!(
            "SELECT {CHANGE_COLUMNS} FROM changes \
             WHERE change_number > $1 AND ($2::object_type IS NULL OR object_type = $2) \
             ORDER BY change_number ASC LIMIT $3"
        ))
        .bind(after)
        .bind(object_type)
        .bind(limit)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| db_error("Failed to list changes", e))
    }

    async fn min_change_number(&mut self) -> AppResult<Option<i64>> {
        sqlx::query_scalar::<_, Option<i64>>("SELECT MIN(change_number) FROM changes")
            .fetch_one(&mut *self.tx)
            .await
            .map_err(|e| db_error("Failed to read minimum change number", e))
    }

    async fn max_change_number(&mut self) -> AppResult<Option<i64>> {
        sqlx::query_scalar::<_, Option<i64>>("SELECT MAX(change_number) FROM changes")
            .fetch_one(&mut *self.tx)
            .await
            .map_err(|e| db_error("Failed to read current change number", e))
    }

    async fn count_changes(&mut self) -> AppResult<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM changes")
            .fetch_one(&mut *self.tx)
            .await
            .map_err(|e| db_error("Failed to count changes", e))
    }

    async fn mark_sent(&mut self, changes: &[ChangeRecord]) -> AppResult<()> {
        for change in changes {
            sqlx::query(
                "INSERT INTO sent_messages (object_id, object_type, change_number, sent_on) \
                 VALUES ($1, $2, $3, NOW()) \
                 ON CONFLICT (object_id, object_type) DO UPDATE SET \
                    change_number = EXCLUDED.change_number, sent_on = EXCLUDED.sent_on",
            )
            .bind(change.object_id)
            .bind(change.object_type)
            .bind(change.change_number)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| db_error("Failed to register sent change", e))?;
        }
        Ok(())
    }

    async fn list_unsent(&mut self, limit: i64) -> AppResult<Vec<ChangeRecord>> {
        sqlx::query_as::<_, ChangeRecord>(
            "SELECT c.change_number, c.object_id, c.object_type, c.change_type, c.object_etag, c.time_stamp \
             FROM changes c \
             LEFT JOIN sent_messages s \
                ON s.object_id = c.object_id AND s.object_type = c.object_type \
                AND s.change_number = c.change_number \
             WHERE s.change_number IS NULL \
             ORDER BY c.change_number ASC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| db_error("Failed to list unsent changes", e))
    }
}
