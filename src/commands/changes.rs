//! Change-log commands.

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use catalog_core::error::AppError;
use catalog_database::CatalogDatabase;
use catalog_entity::{ChangeRecord, ObjectType};
use catalog_service::CatalogService;

use crate::output::{self, OutputFormat};

/// Arguments for change-log commands
#[derive(Debug, Args)]
pub struct ChangesArgs {
    /// Change-log subcommand
    #[command(subcommand)]
    pub command: ChangesCommand,
}

/// Change-log subcommands
#[derive(Debug, Subcommand)]
pub enum ChangesCommand {
    /// List changes after a change number
    List {
        /// Exclusive lower bound on change number
        #[arg(short, long, default_value = "0")]
        after: i64,
        /// Only this object type (ENTITY, ACCESS_CONTROL_LIST, ...)
        #[arg(short = 't', long = "type")]
        object_type: Option<ObjectType>,
        /// Maximum number of changes
        #[arg(short, long, default_value = "100")]
        limit: i64,
    },
    /// Show the range and size of the change log
    Status,
    /// Delete every change and delivery marker
    Purge {
        /// Required; purging cannot be undone
        #[arg(long)]
        force: bool,
    },
}

/// Change display row
#[derive(Debug, Serialize, Tabled)]
struct ChangeRow {
    /// Change number
    number: i64,
    /// Object ID
    object_id: i64,
    /// Object type
    object_type: String,
    /// Change type
    change_type: String,
    /// Object eTag
    etag: String,
    /// Time stamp
    timestamp: String,
}

impl From<&ChangeRecord> for ChangeRow {
    fn from(c: &ChangeRecord) -> Self {
        Self {
            number: c.change_number,
            object_id: c.object_id,
            object_type: c.object_type.to_string(),
            change_type: c.change_type.to_string(),
            etag: c.object_etag.clone().unwrap_or_default(),
            timestamp: c.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

/// Execute change-log commands
pub async fn execute<D: CatalogDatabase>(
    args: &ChangesArgs,
    service: &CatalogService<D>,
    format: OutputFormat,
) -> Result<(), AppError> {
    match &args.command {
        ChangesCommand::List {
            after,
            object_type,
            limit,
        } => {
            let changes = service.list_changes(*after, *object_type, *limit).await?;
            let rows: Vec<ChangeRow> = changes.iter().map(ChangeRow::from).collect();
            output::print_list(&rows, format);
        }
        ChangesCommand::Status => {
            let min = service.minimum_change_number().await?;
            let current = service.current_change_number().await?;
            let count = service.change_count().await?;
            let show = |n: Option<i64>| n.map(|v| v.to_string()).unwrap_or_else(|| "-".into());
            output::print_kv("Minimum change", &show(min));
            output::print_kv("Current change", &show(current));
            output::print_kv("Rows", &count.to_string());
        }
        ChangesCommand::Purge { force } => {
            if !force {
                output::print_warning("Refusing to purge without --force.");
                return Ok(());
            }
            let removed = service.purge_changes().await?;
            output::print_success(&format!("Purged {removed} change(s)."));
        }
    }

    Ok(())
}
