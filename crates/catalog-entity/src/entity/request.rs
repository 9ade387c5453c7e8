//! Input shapes for entity and version mutations.

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use catalog_core::types::EntityId;

use super::annotation::Annotations;
use super::entity_type::EntityType;

/// Maximum length of entity names, aliases, and version labels.
pub const MAX_NAME_LENGTH: u64 = 256;

/// Data required to create a new entity and its first revision.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewEntity {
    /// Parent entity (None creates a root).
    pub parent_id: Option<EntityId>,
    /// Name, unique among siblings.
    #[validate(length(min = 1, max = 256), custom(function = "validate_entity_name"))]
    pub name: String,
    /// Optional alias, unique among siblings.
    #[validate(length(min = 1, max = 256))]
    pub alias: Option<String>,
    /// Kind of entity.
    pub entity_type: EntityType,
    /// Label of version 1 (defaults to "1").
    #[validate(length(min = 1, max = 256))]
    pub version_label: Option<String>,
    /// Comment on version 1.
    pub version_comment: Option<String>,
    /// Reference into external content storage.
    pub content_reference: Option<String>,
    /// Annotations of version 1.
    #[serde(default)]
    pub annotations: Annotations,
}

impl NewEntity {
    /// Minimal constructor; optional fields start empty.
    pub fn new(parent_id: Option<EntityId>, name: impl Into<String>, entity_type: EntityType) -> Self {
        Self {
            parent_id,
            name: name.into(),
            alias: None,
            entity_type,
            version_label: None,
            version_comment: None,
            content_reference: None,
            annotations: Annotations::default(),
        }
    }
}

/// Changes applied by an entity update.
///
/// The eTag must equal the stored one; tree fields are applied to the
/// entity row and content fields to its current revision.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct EntityUpdate {
    /// Entity being updated.
    pub id: EntityId,
    /// eTag the caller last observed.
    #[validate(length(min = 1))]
    pub etag: String,
    /// New name.
    #[validate(length(min = 1, max = 256), custom(function = "validate_entity_name"))]
    pub name: String,
    /// New alias.
    #[validate(length(min = 1, max = 256))]
    pub alias: Option<String>,
    /// New label of the current revision.
    #[validate(length(min = 1, max = 256))]
    pub version_label: String,
    /// New comment of the current revision.
    pub version_comment: Option<String>,
    /// New content reference of the current revision.
    pub content_reference: Option<String>,
    /// New annotations of the current revision.
    #[serde(default)]
    pub annotations: Annotations,
}

/// Request to snapshot a new revision.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewVersion {
    /// Entity receiving the revision.
    pub id: EntityId,
    /// eTag the caller last observed.
    #[validate(length(min = 1))]
    pub etag: String,
    /// Label; defaults to the decimal version number.
    #[validate(length(min = 1, max = 256))]
    pub label: Option<String>,
    /// Comment on the new revision.
    pub comment: Option<String>,
    /// Content reference; the previous revision's is carried forward when absent.
    pub content_reference: Option<String>,
    /// Annotations; the previous revision's are carried forward when absent.
    pub annotations: Option<Annotations>,
}

/// Allowed characters: letters, digits, space, and `_ - . + ( ) '`.
pub fn validate_entity_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::new("blank_name"));
    }
    let allowed = |c: char| c.is_alphanumeric() || " _-.+()'".contains(c);
    if name.chars().all(allowed) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_name_characters"))
    }
}

/// Aliases are restricted to ASCII letters, digits, and underscores.
pub fn validate_alias(alias: &str) -> Result<(), ValidationError> {
    if !alias.is_empty() && alias.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_alias_characters"))
    }
}
