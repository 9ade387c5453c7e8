//! Change record model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::kind::{ChangeType, ObjectType};

/// One row of the change log, unique per `(object_id, object_type)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct ChangeRecord {
    /// Global, strictly increasing sequence number.
    pub change_number: i64,
    /// Identifier of the changed object.
    pub object_id: i64,
    /// Kind of the changed object.
    pub object_type: ObjectType,
    /// What happened.
    pub change_type: ChangeType,
    /// eTag of the object after the change; None only for deletions.
    pub object_etag: Option<String>,
    /// When the change was recorded.
    #[sqlx(rename = "time_stamp")]
    pub timestamp: DateTime<Utc>,
}

impl ChangeRecord {
    /// A record not yet assigned a change number.
    pub fn pending(
        object_id: i64,
        object_type: ObjectType,
        change_type: ChangeType,
        object_etag: Option<String>,
    ) -> Self {
        Self {
            change_number: 0,
            object_id,
            object_type,
            change_type,
            object_etag,
            timestamp: Utc::now(),
        }
    }

    /// Canonical batch ordering key.
    pub fn sort_key(&self) -> (ObjectType, i64) {
        (self.object_type, self.object_id)
    }
}
