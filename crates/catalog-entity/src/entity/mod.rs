//! Entity domain models.

pub mod annotation;
pub mod entity_type;
pub mod model;
pub mod request;

pub use annotation::{AnnotationValue, Annotations};
pub use entity_type::EntityType;
pub use model::{Entity, EntityHeader, VersionedEntity};
pub use request::{EntityUpdate, NewEntity, NewVersion};
