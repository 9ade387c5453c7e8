//! Benefactor, ACL, and access-check commands.

use std::collections::BTreeSet;

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use catalog_core::error::AppError;
use catalog_core::types::{EntityId, PrincipalId};
use catalog_database::CatalogDatabase;
use catalog_entity::{AccessType, ResourceAccess};
use catalog_service::{CatalogService, RequestContext};

use crate::output::{self, OutputFormat};

/// Arguments for access commands
#[derive(Debug, Args)]
pub struct AccessArgs {
    /// Access subcommand
    #[command(subcommand)]
    pub command: AccessCommand,
}

/// Access subcommands
#[derive(Debug, Subcommand)]
pub enum AccessCommand {
    /// Show the entity whose ACL governs an entity
    Benefactor {
        /// Entity ID
        id: EntityId,
    },
    /// Check whether any of the principals holds an access type
    Check {
        /// Entity ID
        id: EntityId,
        /// Principal IDs (the user and all of its groups)
        #[arg(short, long = "principal", required = true)]
        principals: Vec<PrincipalId>,
        /// Access type, e.g. READ or UPDATE
        #[arg(short, long, default_value = "READ")]
        access: AccessType,
    },
    /// Show the ACL owned by an entity
    Acl {
        /// Entity ID
        id: EntityId,
    },
    /// Grant access types to a principal, creating the ACL if needed
    Grant {
        /// Entity ID
        id: EntityId,
        /// Principal ID
        #[arg(short, long)]
        principal: PrincipalId,
        /// Access types to grant
        #[arg(short, long = "access", required = true)]
        access: Vec<AccessType>,
    },
    /// Delete the ACL of an entity so it inherits again
    Inherit {
        /// Entity ID
        id: EntityId,
    },
}

/// ACL entry display row
#[derive(Debug, Serialize, Tabled)]
struct GrantRow {
    /// Principal ID
    principal: String,
    /// Granted access types
    access: String,
}

/// Execute access commands
pub async fn execute<D: CatalogDatabase>(
    args: &AccessArgs,
    service: &CatalogService<D>,
    ctx: &RequestContext,
    format: OutputFormat,
) -> Result<(), AppError> {
    match &args.command {
        AccessCommand::Benefactor { id } => {
            let benefactor = service.get_benefactor(*id).await?;
            output::print_kv("Entity", &id.to_string());
            output::print_kv("Benefactor", &benefactor.to_string());
        }
        AccessCommand::Check {
            id,
            principals,
            access,
        } => {
            let principals: BTreeSet<PrincipalId> = principals.iter().copied().collect();
            let granted = service.can_access(&principals, *id, *access).await?;
            output::print_kv("Entity", &id.to_string());
            output::print_kv("Access", access.as_str());
            output::print_kv("Granted", &granted.to_string());
        }
        AccessCommand::Acl { id } => {
            let acl = service.get_acl(*id).await?;
            let rows: Vec<GrantRow> = acl
                .resource_access
                .iter()
                .map(|ra| GrantRow {
                    principal: ra.principal_id.to_string(),
                    access: ra
                        .access_types
                        .iter()
                        .map(|a| a.as_str())
                        .collect::<Vec<_>>()
                        .join(", "),
                })
                .collect();
            output::print_kv("eTag", &acl.etag);
            output::print_list(&rows, format);
        }
        AccessCommand::Grant {
            id,
            principal,
            access,
        } => {
            let grant = ResourceAccess::new(*principal, access.iter().copied());
            let acl = match service.get_acl(*id).await {
                Ok(mut acl) => {
                    acl.resource_access.push(grant);
                    service.update_acl(ctx, acl).await?
                }
                Err(e) if e.kind == catalog_core::ErrorKind::NotFound => {
                    service.create_acl(ctx, *id, vec![grant]).await?
                }
                Err(e) => return Err(e),
            };
            output::print_success(&format!(
                "ACL of {} now has {} entr(ies)",
                acl.resource_id,
                acl.resource_access.len()
            ));
        }
        AccessCommand::Inherit { id } => {
            if service.delete_acl(ctx, *id).await? {
                output::print_success(&format!("{id} now inherits its ACL"));
            } else {
                output::print_warning(&format!("{id} has no ACL of its own"));
            }
        }
    }

    Ok(())
}
