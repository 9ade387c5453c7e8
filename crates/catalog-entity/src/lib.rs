//! # catalog-entity
//!
//! Domain models for the data catalog. Every struct in this crate
//! represents a logical table row or a domain value object. All models
//! derive `Debug`, `Clone`, `Serialize`, `Deserialize`, and table rows
//! additionally derive `sqlx::FromRow`.

pub mod change;
pub mod entity;
pub mod lineage;
pub mod permission;
pub mod revision;

pub use change::{ChangeRecord, ChangeType, ObjectType};
pub use entity::{
    AnnotationValue, Annotations, Entity, EntityHeader, EntityType, EntityUpdate, NewEntity,
    NewVersion, VersionedEntity,
};
pub use lineage::LineageLink;
pub use permission::{AccessControlList, AccessType, ResourceAccess};
pub use revision::Revision;
