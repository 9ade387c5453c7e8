//! Canonical ordering of change batches.

use catalog_entity::ChangeRecord;

/// Sort a batch by `(object_type, object_id)`.
///
/// Concurrent batches touching overlapping objects then lock their rows in
/// the same order. The sort is stable, so repeated entries for one object
/// keep their relative order and the last one wins.
pub fn sort_batch(batch: &mut [ChangeRecord]) {
    batch.sort_by_key(ChangeRecord::sort_key);
}
