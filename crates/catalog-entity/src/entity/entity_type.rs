//! Entity type enumeration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The kind of catalog entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "entity_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    /// Top-level container.
    Project,
    /// Nested container.
    Folder,
    /// A file whose bytes live in external content storage.
    File,
    /// A tabular dataset.
    Table,
    /// A pointer to another entity.
    Link,
    /// A view over other entities.
    EntityView,
    /// A container image repository.
    DockerRepo,
}

impl EntityType {
    /// Return the type as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Project => "project",
            Self::Folder => "folder",
            Self::File => "file",
            Self::Table => "table",
            Self::Link => "link",
            Self::EntityView => "entityview",
            Self::DockerRepo => "dockerrepo",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = catalog_core::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "project" => Ok(Self::Project),
            "folder" => Ok(Self::Folder),
            "file" => Ok(Self::File),
            "table" => Ok(Self::Table),
            "link" => Ok(Self::Link),
            "entityview" => Ok(Self::EntityView),
            "dockerrepo" => Ok(Self::DockerRepo),
            _ => Err(catalog_core::AppError::validation(format!(
                "Invalid entity type: '{s}'"
            ))),
        }
    }
}
