//! # catalog-database
//!
//! Row-level store traits for the data catalog plus two backends:
//!
//! - `postgres`: sqlx against PostgreSQL, row locks via `SELECT ... FOR UPDATE`
//! - `memory`: in-process tables with per-row async locks, used by tests
//!   and embedded tooling
//!
//! Every operation runs on a transaction handle. Components above this crate
//! are generic over [`CatalogDatabase`], so the backend is chosen once at
//! startup.

pub mod store;

#[cfg(feature = "postgres")]
pub mod connection;
#[cfg(feature = "postgres")]
pub mod migration;
#[cfg(feature = "postgres")]
pub mod postgres;

#[cfg(feature = "memory")]
pub mod memory;

pub use store::{AclRows, CatalogDatabase, CatalogTx, ChangeRows, EntityRows, RevisionRows};

#[cfg(feature = "postgres")]
pub use connection::{DatabasePool, SchemaStatus};
#[cfg(feature = "postgres")]
pub use postgres::PgCatalog;

#[cfg(feature = "memory")]
pub use memory::MemoryCatalog;
