//! Store traits implemented by every backend.
//!
//! The traits expose row operations only. Tree walks, validation, and
//! change bookkeeping live in the service layer so both backends share
//! one set of semantics.

pub mod acl;
pub mod change;
pub mod entity;
pub mod revision;

use async_trait::async_trait;

use catalog_core::result::AppResult;

pub use acl::AclRows;
pub use change::ChangeRows;
pub use entity::EntityRows;
pub use revision::RevisionRows;

/// A unit of atomic work against the catalog tables.
///
/// Dropping a transaction without committing rolls it back and releases
/// every row lock it holds.
#[async_trait]
pub trait CatalogTx: EntityRows + RevisionRows + AclRows + ChangeRows + Send {
    /// Make every write of this transaction visible atomically.
    async fn commit(self) -> AppResult<()>;

    /// Discard every write of this transaction.
    async fn rollback(self) -> AppResult<()>;
}

/// A handle that opens transactions.
#[async_trait]
pub trait CatalogDatabase: Send + Sync + 'static {
    /// Transaction type produced by [`CatalogDatabase::begin`].
    type Tx: CatalogTx + 'static;

    /// Start a transaction.
    async fn begin(&self) -> AppResult<Self::Tx>;

    /// Short backend name used in logs.
    fn backend_name(&self) -> &'static str;
}
