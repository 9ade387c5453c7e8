//! Mapping of PostgreSQL errors onto the catalog taxonomy.

use catalog_core::error::{AppError, ErrorKind};

const LOCK_NOT_AVAILABLE: &str = "55P03";
const DEADLOCK_DETECTED: &str = "40P01";
const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";

/// Convert a sqlx error, classifying lock waits and constraint violations.
pub(crate) fn db_error(context: &str, err: sqlx::Error) -> AppError {
    let classified = match &err {
        sqlx::Error::Database(db) => classify(db.code().as_deref(), db.constraint()),
        _ => None,
    };

    match classified {
        Some((kind, reason)) => AppError::with_source(kind, format!("{context}: {reason}"), err),
        None => AppError::with_source(ErrorKind::Database, format!("{context}: {err}"), err),
    }
}

fn classify(code: Option<&str>, constraint: Option<&str>) -> Option<(ErrorKind, &'static str)> {
    match code? {
        LOCK_NOT_AVAILABLE => Some((ErrorKind::LockTimeout, "row lock wait timed out")),
        DEADLOCK_DETECTED => Some((ErrorKind::LockTimeout, "deadlock detected, retry")),
        UNIQUE_VIOLATION => Some(match constraint {
            Some("entities_parent_name_key") => {
                (ErrorKind::NameConflict, "a sibling already uses this name")
            }
            Some("entities_parent_alias_key") => {
                (ErrorKind::NameConflict, "a sibling already uses this alias")
            }
            Some("revisions_entity_label_key") => {
                (ErrorKind::Conflict, "the entity already has a version with this label")
            }
            Some("acls_pkey") => (ErrorKind::Conflict, "the resource already has an ACL"),
            _ => (ErrorKind::Conflict, "duplicate key"),
        }),
        FOREIGN_KEY_VIOLATION => Some((
            ErrorKind::Conflict,
            "a referenced entity was changed concurrently",
        )),
        _ => None,
    }
}
