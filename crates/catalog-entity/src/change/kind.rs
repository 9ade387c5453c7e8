//! Change and object type enumerations.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use catalog_core::AppError;

/// What happened to an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "change_type", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeType {
    Create,
    Update,
    Delete,
}

impl ChangeType {
    /// Whether records of this type must carry an eTag.
    pub fn requires_etag(&self) -> bool {
        !matches!(self, Self::Delete)
    }

    /// Return the wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "CREATE",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChangeType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "CREATE" => Ok(Self::Create),
            "UPDATE" => Ok(Self::Update),
            "DELETE" => Ok(Self::Delete),
            _ => Err(AppError::validation(format!("Invalid change type: '{s}'"))),
        }
    }
}

/// Kind of object a change refers to.
///
/// The declaration order defines the canonical order used when sorting
/// change batches.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "object_type", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ObjectType {
    Entity,
    AccessControlList,
    Principal,
    Activity,
    Table,
    EntityView,
    Wiki,
}

impl ObjectType {
    /// All object types, in canonical order.
    pub const ALL: [ObjectType; 7] = [
        Self::Entity,
        Self::AccessControlList,
        Self::Principal,
        Self::Activity,
        Self::Table,
        Self::EntityView,
        Self::Wiki,
    ];

    /// Return the wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Entity => "ENTITY",
            Self::AccessControlList => "ACCESS_CONTROL_LIST",
            Self::Principal => "PRINCIPAL",
            Self::Activity => "ACTIVITY",
            Self::Table => "TABLE",
            Self::EntityView => "ENTITY_VIEW",
            Self::Wiki => "WIKI",
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ObjectType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_uppercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == wanted)
            .ok_or_else(|| AppError::validation(format!("Invalid object type: '{s}'")))
    }
}
