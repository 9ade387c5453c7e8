//! Immutable per-version snapshots of entity content metadata.

pub mod model;

pub use model::Revision;
