//! Committed tables, per-transaction write sets, and the merged view.

use std::collections::BTreeMap;

use catalog_core::AppError;
use catalog_core::result::AppResult;
use catalog_core::types::EntityId;
use catalog_entity::{AccessControlList, ChangeRecord, Entity, ObjectType, Revision};

pub(super) type ChangeKey = (ObjectType, i64);

static NO_CHANGES: BTreeMap<ChangeKey, ChangeRecord> = BTreeMap::new();
static NO_SENT: BTreeMap<ChangeKey, i64> = BTreeMap::new();

/// Committed rows.
#[derive(Debug, Default)]
pub(super) struct Tables {
    pub(super) entities: BTreeMap<EntityId, Entity>,
    pub(super) revisions: BTreeMap<(EntityId, i64), Revision>,
    pub(super) acls: BTreeMap<EntityId, AccessControlList>,
    pub(super) changes: BTreeMap<ChangeKey, ChangeRecord>,
    pub(super) sent: BTreeMap<ChangeKey, i64>,
}

/// Uncommitted writes of one transaction. `None` marks a deletion.
#[derive(Debug, Default)]
pub(super) struct WriteSet {
    pub(super) entities: BTreeMap<EntityId, Option<Entity>>,
    pub(super) revisions: BTreeMap<(EntityId, i64), Option<Revision>>,
    pub(super) acls: BTreeMap<EntityId, Option<AccessControlList>>,
    pub(super) changes: BTreeMap<ChangeKey, Option<ChangeRecord>>,
    pub(super) sent: BTreeMap<ChangeKey, i64>,
    pub(super) purge_changes: bool,
}

impl WriteSet {
    pub(super) fn is_empty(&self) -> bool {
        self.entities.is_empty()
            && self.revisions.is_empty()
            && self.acls.is_empty()
            && self.changes.is_empty()
            && self.sent.is_empty()
            && !self.purge_changes
    }
}

impl Tables {
    /// Apply a validated write set.
    pub(super) fn apply(&mut self, writes: WriteSet) {
        if writes.purge_changes {
            self.changes.clear();
            self.sent.clear();
        }
        apply_map(&mut self.entities, writes.entities);
        apply_map(&mut self.revisions, writes.revisions);
        apply_map(&mut self.acls, writes.acls);
        apply_map(&mut self.changes, writes.changes);
        self.sent.extend(writes.sent);
    }
}

fn apply_map<K: Ord, V>(base: &mut BTreeMap<K, V>, overlay: BTreeMap<K, Option<V>>) {
    for (key, value) in overlay {
        match value {
            Some(value) => {
                base.insert(key, value);
            }
            None => {
                base.remove(&key);
            }
        }
    }
}

fn merged<'a, K: Ord, V>(
    base: &'a BTreeMap<K, V>,
    overlay: &'a BTreeMap<K, Option<V>>,
) -> impl Iterator<Item = &'a V> + 'a {
    base.iter()
        .filter(move |(key, _)| !overlay.contains_key(*key))
        .map(|(_, value)| value)
        .chain(overlay.values().filter_map(Option::as_ref))
}

fn lookup<'a, K: Ord, V>(
    base: &'a BTreeMap<K, V>,
    overlay: &'a BTreeMap<K, Option<V>>,
    key: &K,
) -> Option<&'a V> {
    match overlay.get(key) {
        Some(value) => value.as_ref(),
        None => base.get(key),
    }
}

/// Committed rows as seen through one transaction's writes.
pub(super) struct View<'a> {
    tables: &'a Tables,
    writes: &'a WriteSet,
}

impl<'a> View<'a> {
    pub(super) fn new(tables: &'a Tables, writes: &'a WriteSet) -> Self {
        Self { tables, writes }
    }

    pub(super) fn entity(&self, id: EntityId) -> Option<&'a Entity> {
        lookup(&self.tables.entities, &self.writes.entities, &id)
    }

    pub(super) fn entities(&self) -> impl Iterator<Item = &'a Entity> + 'a {
        merged(&self.tables.entities, &self.writes.entities)
    }

    pub(super) fn children(&self, parent_id: EntityId) -> Vec<&'a Entity> {
        let mut children: Vec<&Entity> = self
            .entities()
            .filter(|e| e.parent_id == Some(parent_id))
            .collect();
        children.sort_by_key(|e| e.id);
        children
    }

    pub(super) fn revision(&self, entity_id: EntityId, version: i64) -> Option<&'a Revision> {
        lookup(
            &self.tables.revisions,
            &self.writes.revisions,
            &(entity_id, version),
        )
    }

    /// Revisions of one entity, ascending by version.
    pub(super) fn revisions_of(&self, entity_id: EntityId) -> Vec<&'a Revision> {
        let mut revisions: Vec<&Revision> = merged(&self.tables.revisions, &self.writes.revisions)
            .filter(|r| r.entity_id == entity_id)
            .collect();
        revisions.sort_by_key(|r| r.version_number);
        revisions
    }

    pub(super) fn acl(&self, resource_id: EntityId) -> Option<&'a AccessControlList> {
        lookup(&self.tables.acls, &self.writes.acls, &resource_id)
    }

    fn committed_changes(&self) -> &'a BTreeMap<ChangeKey, ChangeRecord> {
        if self.writes.purge_changes {
            &NO_CHANGES
        } else {
            &self.tables.changes
        }
    }

    pub(super) fn change(&self, key: ChangeKey) -> Option<&'a ChangeRecord> {
        lookup(self.committed_changes(), &self.writes.changes, &key)
    }

    /// All change rows, with committed rows at or above `watermark` hidden.
    pub(super) fn changes_below(&self, watermark: i64) -> Vec<&'a ChangeRecord> {
        let overlay = &self.writes.changes;
        let mut rows: Vec<&ChangeRecord> = self
            .committed_changes()
            .iter()
            .filter(|(key, row)| !overlay.contains_key(*key) && row.change_number < watermark)
            .map(|(_, row)| row)
            .chain(overlay.values().filter_map(Option::as_ref))
            .collect();
        rows.sort_by_key(|r| r.change_number);
        rows
    }

    pub(super) fn all_changes(&self) -> impl Iterator<Item = &'a ChangeRecord> + 'a {
        merged(self.committed_changes(), &self.writes.changes)
    }

    pub(super) fn sent(&self, key: ChangeKey) -> Option<i64> {
        let committed = if self.writes.purge_changes {
            &NO_SENT
        } else {
            &self.tables.sent
        };
        self.writes
            .sent
            .get(&key)
            .or_else(|| committed.get(&key))
            .copied()
    }

    /// Sibling name and alias uniqueness for `entity`.
    pub(super) fn check_siblings(&self, entity: &Entity) -> AppResult<()> {
        for other in self.entities() {
            if other.id == entity.id || other.parent_id != entity.parent_id {
                continue;
            }
            if other.name == entity.name {
                return Err(AppError::name_conflict(format!(
                    "An entity named '{}' already exists in this location",
                    entity.name
                )));
            }
            if entity.alias.is_some() && other.alias == entity.alias {
                return Err(AppError::name_conflict(format!(
                    "An entity with alias '{}' already exists in this location",
                    entity.alias.as_deref().unwrap_or_default()
                )));
            }
        }
        Ok(())
    }

    /// The parent of `entity` must exist.
    pub(super) fn check_parent(&self, entity: &Entity) -> AppResult<()> {
        match entity.parent_id {
            Some(parent_id) if self.entity(parent_id).is_none() => Err(AppError::conflict(
                format!("Parent {parent_id} of {} no longer exists", entity.id),
            )),
            _ => Ok(()),
        }
    }

    /// Labels are unique per entity.
    pub(super) fn check_label(&self, revision: &Revision) -> AppResult<()> {
        let clash = self
            .revisions_of(revision.entity_id)
            .into_iter()
            .any(|r| r.version_number != revision.version_number && r.label == revision.label);
        if clash {
            return Err(AppError::conflict(format!(
                "Entity {} already has a version labeled '{}'",
                revision.entity_id, revision.label
            )));
        }
        Ok(())
    }

    /// Re-check every constraint touched by the write set against the
    /// latest committed rows.
    pub(super) fn check_commit(&self) -> AppResult<()> {
        for (id, row) in &self.writes.entities {
            match row {
                Some(entity) => {
                    self.check_siblings(entity)?;
                    self.check_parent(entity)?;
                }
                None => {
                    if !self.children(*id).is_empty() {
                        return Err(AppError::conflict(format!(
                            "Entity {id} gained children concurrently"
                        )));
                    }
                }
            }
        }
        for revision in self.writes.revisions.values().flatten() {
            if self.entity(revision.entity_id).is_none() {
                return Err(AppError::conflict(format!(
                    "Entity {} no longer exists",
                    revision.entity_id
                )));
            }
            self.check_label(revision)?;
        }
        for acl in self.writes.acls.values().flatten() {
            if self.entity(acl.resource_id).is_none() {
                return Err(AppError::conflict(format!(
                    "Entity {} no longer exists",
                    acl.resource_id
                )));
            }
        }
        Ok(())
    }
}
