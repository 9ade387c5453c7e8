//! Benefactor resolution.
//!
//! Resolution rules:
//! - An entity that owns an ACL is its own benefactor.
//! - Otherwise the walk moves to the parent and repeats.
//! - A root without an ACL is its own implicit benefactor.
//! - A self-parent, a cycle, a dangling parent, or a walk longer than the
//!   hop bound is a broken hierarchy and fails immediately.
//!
//! The walk runs over an immutable snapshot of the parent chain read once at
//! the start, so it is a pure function of that snapshot.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, warn};

use catalog_core::config::LimitsConfig;
use catalog_core::error::{AppError, ErrorKind};
use catalog_core::result::AppResult;
use catalog_core::types::EntityId;
use catalog_database::EntityRows;
use catalog_entity::LineageLink;

/// Immutable `id -> (parent, has ACL)` snapshot of a parent chain.
#[derive(Debug, Clone, Default)]
pub struct LineageSnapshot {
    links: BTreeMap<EntityId, LineageLink>,
}

impl LineageSnapshot {
    /// Build a snapshot from chain links. Repeated ids collapse.
    pub fn from_links(links: impl IntoIterator<Item = LineageLink>) -> Self {
        Self {
            links: links.into_iter().map(|link| (link.id, link)).collect(),
        }
    }

    /// Find the benefactor of `start`, following at most `max_hops` parent
    /// pointers.
    pub fn resolve(&self, start: EntityId, max_hops: usize) -> AppResult<EntityId> {
        let mut current = self
            .links
            .get(&start)
            .ok_or_else(|| AppError::not_found(format!("Entity {start} not found")))?;
        let mut visited = BTreeSet::from([start]);
        let mut hops = 0usize;

        loop {
            if current.has_acl {
                return Ok(current.id);
            }
            let Some(parent_id) = current.parent_id else {
                return Ok(current.id);
            };
            if parent_id == current.id {
                return Err(AppError::broken_hierarchy(format!(
                    "Entity {} is its own parent",
                    current.id
                )));
            }

            hops += 1;
            if hops > max_hops {
                return Err(AppError::broken_hierarchy(format!(
                    "No benefactor for {start} within {max_hops} hops"
                )));
            }
            if !visited.insert(parent_id) {
                return Err(AppError::broken_hierarchy(format!(
                    "Cycle through {parent_id} in the ancestry of {start}"
                )));
            }

            current = self.links.get(&parent_id).ok_or_else(|| {
                AppError::broken_hierarchy(format!(
                    "Entity {} references missing parent {parent_id}",
                    current.id
                ))
            })?;
        }
    }
}

/// Reads lineage snapshots and resolves benefactors.
#[derive(Debug, Clone, Copy)]
pub struct BenefactorResolver {
    max_hops: usize,
}

impl BenefactorResolver {
    /// Create a resolver bounded by `max_tree_depth * benefactor_hop_factor`.
    pub fn new(limits: &LimitsConfig) -> Self {
        Self {
            max_hops: limits.max_benefactor_hops(),
        }
    }

    /// Create a resolver with an explicit hop bound.
    pub fn with_max_hops(max_hops: usize) -> Self {
        Self { max_hops }
    }

    /// The hop bound.
    pub fn max_hops(&self) -> usize {
        self.max_hops
    }

    /// Resolve the benefactor of `entity_id` inside `tx`.
    pub async fn get_benefactor<T>(&self, tx: &mut T, entity_id: EntityId) -> AppResult<EntityId>
    where
        T: EntityRows + ?Sized,
    {
        let links = tx.lineage(entity_id, self.max_hops + 1).await?;
        let snapshot = LineageSnapshot::from_links(links);

        match snapshot.resolve(entity_id, self.max_hops) {
            Ok(benefactor) => {
                debug!(entity_id = %entity_id, benefactor = %benefactor, "Resolved benefactor");
                Ok(benefactor)
            }
            Err(e) => {
                if e.kind == ErrorKind::BrokenHierarchy {
                    warn!(entity_id = %entity_id, error = %e, "Broken entity hierarchy");
                }
                Err(e)
            }
        }
    }
}
