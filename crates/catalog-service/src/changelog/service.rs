//! Change-log operations.

use tracing::{debug, info};

use catalog_core::config::LimitsConfig;
use catalog_core::error::AppError;
use catalog_core::result::AppResult;
use catalog_database::ChangeRows;
use catalog_entity::{ChangeRecord, ChangeType, ObjectType};

use super::batch::sort_batch;

/// Appends and reads change records.
///
/// Appends replace the row for `(object_id, object_type)`, so a reader
/// resuming from any observed change number sees each object at most once
/// with its latest state.
#[derive(Debug, Clone, Copy)]
pub struct ChangeLog {
    max_list_limit: i64,
}

impl ChangeLog {
    /// Creates a change log that caps listings at `change_list_max_limit`.
    pub fn new(limits: &LimitsConfig) -> Self {
        Self {
            max_list_limit: i64::from(limits.change_list_max_limit),
        }
    }

    /// Check the required fields of a change.
    pub fn validate(change: &ChangeRecord) -> AppResult<()> {
        if change.object_id < 0 {
            return Err(AppError::validation("Change object id must not be negative"));
        }
        match (change.change_type.requires_etag(), &change.object_etag) {
            (true, None) => Err(AppError::validation(format!(
                "{} changes require an eTag",
                change.change_type
            ))),
            (true, Some(etag)) if etag.trim().is_empty() => Err(AppError::validation(format!(
                "{} changes require a non-empty eTag",
                change.change_type
            ))),
            (false, Some(_)) => Err(AppError::validation("DELETE changes must not carry an eTag")),
            _ => Ok(()),
        }
    }

    /// Record one change, replacing any earlier row for the same object.
    pub async fn append<T>(
        &self,
        tx: &mut T,
        object_id: i64,
        object_type: ObjectType,
        change_type: ChangeType,
        object_etag: Option<String>,
    ) -> AppResult<ChangeRecord>
    where
        T: ChangeRows + ?Sized,
    {
        self.append_record(
            tx,
            ChangeRecord::pending(object_id, object_type, change_type, object_etag),
        )
        .await
    }

    /// Record one prepared change.
    pub async fn append_record<T>(&self, tx: &mut T, change: ChangeRecord) -> AppResult<ChangeRecord>
    where
        T: ChangeRows + ?Sized,
    {
        Self::validate(&change)?;
        let stored = tx.upsert_change(&change).await?;
        debug!(
            object_id = stored.object_id,
            object_type = %stored.object_type,
            change_type = %stored.change_type,
            change_number = stored.change_number,
            "Appended change"
        );
        Ok(stored)
    }

    /// Record a batch in canonical `(object_type, object_id)` order.
    ///
    /// Every record is validated before any is written. The returned records
    /// are in write order, which is also ascending change-number order.
    pub async fn append_batch<T>(
        &self,
        tx: &mut T,
        mut batch: Vec<ChangeRecord>,
    ) -> AppResult<Vec<ChangeRecord>>
    where
        T: ChangeRows + ?Sized,
    {
        for change in &batch {
            Self::validate(change)?;
        }
        sort_batch(&mut batch);

        let mut stored = Vec::with_capacity(batch.len());
        for change in &batch {
            stored.push(tx.upsert_change(change).await?);
        }
        info!(count = stored.len(), "Appended change batch");
        Ok(stored)
    }

    /// Changes numbered after `after`, ascending, optionally of one type.
    pub async fn list<T>(
        &self,
        tx: &mut T,
        after: i64,
        object_type: Option<ObjectType>,
        limit: i64,
    ) -> AppResult<Vec<ChangeRecord>>
    where
        T: ChangeRows + ?Sized,
    {
        let limit = self.check_limit(limit)?;
        tx.list_changes(after, object_type, limit).await
    }

    /// Remove the row for one object.
    pub async fn delete<T>(&self, tx: &mut T, object_id: i64, object_type: ObjectType) -> AppResult<bool>
    where
        T: ChangeRows + ?Sized,
    {
        tx.delete_change(object_id, object_type).await
    }

    /// Remove every change and delivery marker.
    pub async fn purge_all<T>(&self, tx: &mut T) -> AppResult<u64>
    where
        T: ChangeRows + ?Sized,
    {
        let removed = tx.delete_all_changes().await?;
        info!(removed, "Purged change log");
        Ok(removed)
    }

    /// Smallest change number present.
    pub async fn minimum_change_number<T>(&self, tx: &mut T) -> AppResult<Option<i64>>
    where
        T: ChangeRows + ?Sized,
    {
        tx.min_change_number().await
    }

    /// Largest change number present.
    pub async fn current_change_number<T>(&self, tx: &mut T) -> AppResult<Option<i64>>
    where
        T: ChangeRows + ?Sized,
    {
        tx.max_change_number().await
    }

    /// Number of rows in the log.
    pub async fn count<T>(&self, tx: &mut T) -> AppResult<i64>
    where
        T: ChangeRows + ?Sized,
    {
        tx.count_changes().await
    }

    /// eTag recorded for an object. DELETE records have none.
    pub async fn get_etag<T>(
        &self,
        tx: &mut T,
        object_id: i64,
        object_type: ObjectType,
    ) -> AppResult<Option<String>>
    where
        T: ChangeRows + ?Sized,
    {
        tx.find_change(object_id, object_type)
            .await?
            .map(|c| c.object_etag)
            .ok_or_else(|| {
                AppError::not_found(format!("No change recorded for {object_type} {object_id}"))
            })
    }

    /// Record delivery of these exact changes.
    pub async fn register_sent<T>(&self, tx: &mut T, changes: &[ChangeRecord]) -> AppResult<()>
    where
        T: ChangeRows + ?Sized,
    {
        tx.mark_sent(changes).await
    }

    /// Changes not yet delivered in their current form.
    pub async fn list_unsent<T>(&self, tx: &mut T, limit: i64) -> AppResult<Vec<ChangeRecord>>
    where
        T: ChangeRows + ?Sized,
    {
        let limit = self.check_limit(limit)?;
        tx.list_unsent(limit).await
    }

    fn check_limit(&self, limit: i64) -> AppResult<i64> {
        if limit < 0 {
            return Err(AppError::validation("Limit must not be negative"));
        }
        Ok(limit.min(self.max_list_limit))
    }
}
