//! Entity tree and version commands.

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use catalog_core::error::AppError;
use catalog_core::types::EntityId;
use catalog_database::CatalogDatabase;
use catalog_entity::{EntityHeader, EntityType, NewEntity, Revision, VersionedEntity};
use catalog_service::{CatalogService, RequestContext};

use crate::output::{self, OutputFormat};

/// Arguments for entity commands
#[derive(Debug, Args)]
pub struct EntityArgs {
    /// Entity subcommand
    #[command(subcommand)]
    pub command: EntityCommand,
}

/// Entity subcommands
#[derive(Debug, Subcommand)]
pub enum EntityCommand {
    /// Create an entity with version 1
    Create {
        /// Entity name
        #[arg(short, long)]
        name: String,
        /// Entity type (project, folder, file, table, link, entityview, dockerrepo)
        #[arg(short = 't', long = "type", default_value = "folder")]
        entity_type: EntityType,
        /// Parent entity (omit for a root)
        #[arg(short, long)]
        parent: Option<EntityId>,
        /// Optional alias
        #[arg(long)]
        alias: Option<String>,
    },
    /// Show an entity at its current or a given version
    Get {
        /// Entity ID (`syn123` or `123`)
        id: EntityId,
        /// Version number
        #[arg(short, long)]
        version: Option<i64>,
    },
    /// Show the path from the root down to an entity
    Path {
        /// Entity ID
        id: EntityId,
    },
    /// List direct children
    Children {
        /// Parent entity ID
        id: EntityId,
    },
    /// List versions, newest first
    Versions {
        /// Entity ID
        id: EntityId,
    },
    /// Delete an entity and everything beneath it
    Delete {
        /// Entity ID
        id: EntityId,
    },
}

/// Entity display row
#[derive(Debug, Serialize, Tabled)]
struct EntityRow {
    /// Entity ID
    id: String,
    /// Parent ID
    parent: String,
    /// Name
    name: String,
    /// Type
    #[tabled(rename = "type")]
    entity_type: String,
    /// Version
    version: i64,
}

impl From<&EntityHeader> for EntityRow {
    fn from(h: &EntityHeader) -> Self {
        Self {
            id: h.id.to_string(),
            parent: h.parent_id.map(|p| p.to_string()).unwrap_or_default(),
            name: h.name.clone(),
            entity_type: h.entity_type.to_string(),
            version: h.current_version,
        }
    }
}

/// Versioned entity display row
#[derive(Debug, Serialize, Tabled)]
struct VersionedRow {
    /// Entity ID
    id: String,
    /// Name
    name: String,
    /// Type
    #[tabled(rename = "type")]
    entity_type: String,
    /// Version shown
    version: i64,
    /// Label
    label: String,
    /// eTag
    etag: String,
    /// Annotation count
    annotations: usize,
    /// Modified at
    modified_on: String,
}

impl From<&VersionedEntity> for VersionedRow {
    fn from(v: &VersionedEntity) -> Self {
        Self {
            id: v.entity.id.to_string(),
            name: v.entity.name.clone(),
            entity_type: v.entity.entity_type.to_string(),
            version: v.revision.version_number,
            label: v.revision.label.clone(),
            etag: v.entity.etag.clone(),
            annotations: v.revision.annotations.len(),
            modified_on: v.entity.modified_on.format("%Y-%m-%d %H:%M").to_string(),
        }
    }
}

/// Revision display row
#[derive(Debug, Serialize, Tabled)]
struct VersionRow {
    /// Version number
    version: i64,
    /// Label
    label: String,
    /// Comment
    comment: String,
    /// Modified by
    modified_by: String,
    /// Modified at
    modified_on: String,
}

impl From<&Revision> for VersionRow {
    fn from(r: &Revision) -> Self {
        Self {
            version: r.version_number,
            label: r.label.clone(),
            comment: r.comment.clone().unwrap_or_default(),
            modified_by: r.modified_by.to_string(),
            modified_on: r.modified_on.format("%Y-%m-%d %H:%M").to_string(),
        }
    }
}

/// Execute entity commands
pub async fn execute<D: CatalogDatabase>(
    args: &EntityArgs,
    service: &CatalogService<D>,
    ctx: &RequestContext,
    format: OutputFormat,
) -> Result<(), AppError> {
    match &args.command {
        EntityCommand::Create {
            name,
            entity_type,
            parent,
            alias,
        } => {
            let mut req = NewEntity::new(*parent, name.clone(), *entity_type);
            req.alias = alias.clone();
            let created = service.create_entity(ctx, req).await?;
            output::print_success(&format!("Created {} '{}'", created.id(), created.entity.name));
            output::print_item(&VersionedRow::from(&created), format);
        }
        EntityCommand::Get { id, version } => {
            let entity = service.get_entity(*id, *version).await?;
            output::print_item(&VersionedRow::from(&entity), format);
        }
        EntityCommand::Path { id } => {
            let path = service.get_entity_path(*id).await?;
            let rows: Vec<EntityRow> = path.iter().map(EntityRow::from).collect();
            output::print_list(&rows, format);
        }
        EntityCommand::Children { id } => {
            let children = service.get_children(*id).await?;
            let rows: Vec<EntityRow> = children.iter().map(EntityRow::from).collect();
            output::print_list(&rows, format);
        }
        EntityCommand::Versions { id } => {
            let versions = service.list_versions(*id).await?;
            let rows: Vec<VersionRow> = versions.iter().map(VersionRow::from).collect();
            output::print_list(&rows, format);
        }
        EntityCommand::Delete { id } => {
            let removed = service.delete_entity(ctx, *id).await?;
            output::print_success(&format!(
                "Deleted {id} and {} descendant(s)",
                removed.saturating_sub(1)
            ));
        }
    }

    Ok(())
}
