//! Change-log rows in memory.

use async_trait::async_trait;

use catalog_core::result::AppResult;
use catalog_entity::{ChangeRecord, ObjectType};

use super::locks::LockKey;
use super::tx::MemoryTx;
use crate::store::ChangeRows;

impl MemoryTx {
    fn watermark(&self) -> AppResult<i64> {
        self.shared.sequence(|seq| seq.watermark(&self.reserved))
    }
}

#[async_trait]
impl ChangeRows for MemoryTx {
    async fn upsert_change(&mut self, change: &ChangeRecord) -> AppResult<ChangeRecord> {
        self.acquire(LockKey::Change(change.object_type, change.object_id))
            .await?;
        let number = self.shared.sequence(|seq| seq.reserve())?;
        self.reserved.push(number);

        let stored = ChangeRecord {
            change_number: number,
            ..change.clone()
        };
        self.writes
            .changes
            .insert((change.object_type, change.object_id), Some(stored.clone()));
        Ok(stored)
    }

    async fn find_change(
        &mut self,
        object_id: i64,
        object_type: ObjectType,
    ) -> AppResult<Option<ChangeRecord>> {
        self.view(|v| v.change((object_type, object_id)).cloned())
    }

    async fn delete_change(&mut self, object_id: i64, object_type: ObjectType) -> AppResult<bool> {
        self.acquire(LockKey::Change(object_type, object_id)).await?;
        let existed = self.view(|v| v.change((object_type, object_id)).is_some())?;
        if existed {
            self.writes.changes.insert((object_type, object_id), None);
        }
        Ok(existed)
    }

    async fn delete_all_changes(&mut self) -> AppResult<u64> {
        let count = self.view(|v| v.all_changes().count() as u64)?;
        self.writes.purge_changes = true;
        self.writes.changes.clear();
        self.writes.sent.clear();
        Ok(count)
    }

    async fn list_changes(
        &mut self,
        after: i64,
        object_type: Option<ObjectType>,
        limit: i64,
    ) -> AppResult<Vec<ChangeRecord>> {
        let watermark = self.watermark()?;
        let limit = usize::try_from(limit).unwrap_or(0);
        self.view(|v| {
            v.changes_below(watermark)
                .into_iter()
                .filter(|c| c.change_number > after)
                .filter(|c| object_type.is_none_or(|t| c.object_type == t))
                .take(limit)
                .cloned()
                .collect()
        })
    }

    async fn min_change_number(&mut self) -> AppResult<Option<i64>> {
        self.view(|v| v.all_changes().map(|c| c.change_number).min())
    }

    async fn max_change_number(&mut self) -> AppResult<Option<i64>> {
        self.view(|v| v.all_changes().map(|c| c.change_number).max())
    }

    async fn count_changes(&mut self) -> AppResult<i64> {
        self.view(|v| v.all_changes().count() as i64)
    }

    async fn mark_sent(&mut self, changes: &[ChangeRecord]) -> AppResult<()> {
        for change in changes {
            self.writes
                .sent
                .insert((change.object_type, change.object_id), change.change_number);
        }
        Ok(())
    }

    async fn list_unsent(&mut self, limit: i64) -> AppResult<Vec<ChangeRecord>> {
        let watermark = self.watermark()?;
        let limit = usize::try_from(limit).unwrap_or(0);
        self.view(|v| {
            v.changes_below(watermark)
                .into_iter()
                .filter(|c| v.sent((c.object_type, c.object_id)) != Some(c.change_number))
                .take(limit)
                .cloned()
                .collect()
        })
    }
}
