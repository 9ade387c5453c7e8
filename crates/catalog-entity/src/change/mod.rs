//! Change-log records.

pub mod kind;
pub mod model;

pub use kind::{ChangeType, ObjectType};
pub use model::ChangeRecord;
