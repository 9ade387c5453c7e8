//! # catalog-service
//!
//! Business logic for the data catalog. Each component works on an open
//! transaction handed in by the caller; [`CatalogService`] composes them,
//! opens one transaction per call, and commits or rolls back as a unit.
//!
//! Components follow constructor injection: shared collaborators are
//! provided at construction time via `Arc` references.

pub mod acl;
pub mod catalog;
pub mod changelog;
pub mod concurrency;
pub mod context;
pub mod entity;

pub use acl::AclStore;
pub use catalog::{CatalogComponents, CatalogService, TxScope};
pub use changelog::ChangeLog;
pub use concurrency::{ConcurrencyController, EntityLock};
pub use context::RequestContext;
pub use entity::EntityStore;
