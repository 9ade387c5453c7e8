//! Change-log table operations.

use async_trait::async_trait;

use catalog_core::result::AppResult;
use catalog_entity::{ChangeRecord, ObjectType};

/// Row operations on the change log.
#[async_trait]
pub trait ChangeRows: Send {
    /// Insert or replace the row for `(object_id, object_type)`.
    ///
    /// The row is locked first and always receives a change number larger
    /// than any previously assigned. Returns the stored record.
    async fn upsert_change(&mut self, change: &ChangeRecord) -> AppResult<ChangeRecord>;

    /// Read the row for one object.
    async fn find_change(
        &mut self,
        object_id: i64,
        object_type: ObjectType,
    ) -> AppResult<Option<ChangeRecord>>;

    /// Delete the row for one object. Returns whether a row was removed.
    async fn delete_change(&mut self, object_id: i64, object_type: ObjectType) -> AppResult<bool>;

    /// Delete every row and delivery marker. Returns the number of rows removed.
    async fn delete_all_changes(&mut self) -> AppResult<u64>;

    /// Rows with a change number greater than `after`, ascending, at most
    /// `limit` of them.
    async fn list_changes(
        &mut self,
        after: i64,
        object_type: Option<ObjectType>,
        limit: i64,
    ) -> AppResult<Vec<ChangeRecord>>;

    /// Smallest change number present.
    async fn min_change_number(&mut self) -> AppResult<Option<i64>>;

    /// Largest change number present.
    async fn max_change_number(&mut self) -> AppResult<Option<i64>>;

    /// Number of rows.
    async fn count_changes(&mut self) -> AppResult<i64>;

    /// Record that these exact changes were delivered downstream.
    async fn mark_sent(&mut self, changes: &[ChangeRecord]) -> AppResult<()>;

    /// Rows whose current change number has not been delivered, ascending.
    async fn list_unsent(&mut self, limit: i64) -> AppResult<Vec<ChangeRecord>>;
}
