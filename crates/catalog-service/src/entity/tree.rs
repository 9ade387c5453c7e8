//! Bounded tree walks: ancestor depth and descendant levels.

use std::collections::BTreeSet;

use catalog_core::error::AppError;
use catalog_core::result::AppResult;
use catalog_core::types::EntityId;
use catalog_database::EntityRows;
use catalog_entity::LineageLink;

/// Depth of the entity at the head of `links` (a root has depth 1).
///
/// `links` is a lineage snapshot read with `limit + 1` links. A repeated id
/// or a chain that stops before reaching a root is a broken hierarchy; a
/// chain that is still going after `limit` links is over the limit.
pub fn chain_depth(id: EntityId, links: &[LineageLink], limit: usize) -> AppResult<usize> {
    let mut seen = BTreeSet::new();
    for link in links {
        if !seen.insert(link.id) {
            return Err(AppError::broken_hierarchy(format!(
                "Cycle through {} in the ancestry of {id}",
                link.id
            )));
        }
    }

    match links.last() {
        None => Err(AppError::not_found(format!("Entity {id} not found"))),
        Some(last) if last.parent_id.is_none() => Ok(links.len()),
        Some(_) if links.len() > limit => Err(AppError::limit_exceeded(format!(
            "Entity {id} is nested deeper than {limit} levels"
        ))),
        Some(last) => Err(AppError::broken_hierarchy(format!(
            "Entity {} references a missing parent",
            last.id
        ))),
    }
}

/// Read the depth of `id` through `tx`.
pub async fn depth_of<T>(tx: &mut T, id: EntityId, limit: usize) -> AppResult<usize>
where
    T: EntityRows + ?Sized,
{
    let links = tx.lineage(id, limit + 1).await?;
    chain_depth(id, &links, limit)
}

/// Collect `root` and its descendants level by level.
///
/// Level 0 is `[root]`; each level is ascending by id. Any descendant more
/// than `max_depth` levels below `root` fails the whole walk with
/// `LimitExceeded`, so callers never act on a truncated subtree.
pub async fn collect_subtree<T>(
    tx: &mut T,
    root: EntityId,
    max_depth: usize,
) -> AppResult<Vec<Vec<EntityId>>>
where
    T: EntityRows + ?Sized,
{
    if tx.find_entity(root).await?.is_none() {
        return Err(AppError::not_found(format!("Entity {root} not found")));
    }

    let mut levels = vec![vec![root]];
    let mut seen = BTreeSet::from([root]);
    loop {
        let frontier = levels.last().cloned().unwrap_or_default();
        let mut next = Vec::new();
        for parent in frontier {
            for child in tx.list_children(parent).await? {
                if !seen.insert(child.id) {
                    return Err(AppError::broken_hierarchy(format!(
                        "Entity {} appears twice below {root}",
                        child.id
                    )));
                }
                next.push(child.id);
            }
        }
        if next.is_empty() {
            return Ok(levels);
        }
        if levels.len() > max_depth {
            return Err(AppError::limit_exceeded(format!(
                "Entity {root} has descendants more than {max_depth} levels deep"
            )));
        }
        levels.push(next);
    }
}
