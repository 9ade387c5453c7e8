//! Shared test helpers for integration tests.

use std::sync::Arc;
use std::time::Duration;

use catalog_core::config::LimitsConfig;
use catalog_core::types::{EntityId, PrincipalId};
use catalog_database::MemoryCatalog;
use catalog_entity::{EntityType, NewEntity, VersionedEntity};
use catalog_service::{CatalogService, RequestContext};

/// Test catalog backed by the in-memory store.
pub struct TestCatalog {
    /// The service under test
    pub service: Arc<CatalogService<MemoryCatalog>>,
    /// Context used for every mutation
    pub ctx: RequestContext,
}

impl TestCatalog {
    /// Create a catalog with default limits
    pub fn new() -> Self {
        Self::with_limits(LimitsConfig::default())
    }

    /// Create a catalog with custom limits
    pub fn with_limits(limits: LimitsConfig) -> Self {
        Self::build(limits, Duration::from_secs(2))
    }

    /// Create a catalog whose row-lock waits give up after `timeout`
    pub fn with_lock_timeout(timeout: Duration) -> Self {
        Self::build(LimitsConfig::default(), timeout)
    }

    fn build(limits: LimitsConfig, lock_timeout: Duration) -> Self {
        let db = MemoryCatalog::new(lock_timeout);
        let service = CatalogService::new(db, &limits).expect("Failed to build catalog service");
        Self {
            service: Arc::new(service),
            ctx: RequestContext::new(PrincipalId(1)),
        }
    }

    /// Create a project at the top of the tree
    pub async fn root(&self, name: &str) -> VersionedEntity {
        self.service
            .create_entity(&self.ctx, NewEntity::new(None, name, EntityType::Project))
            .await
            .expect("Failed to create root")
    }

    /// Create a folder under `parent`
    pub async fn child(&self, parent: EntityId, name: &str) -> VersionedEntity {
        self.service
            .create_entity(
                &self.ctx,
                NewEntity::new(Some(parent), name, EntityType::Folder),
            )
            .await
            .expect("Failed to create child")
    }

    /// Create a chain of `depth` folders below `parent`, returning them top-down
    pub async fn chain(&self, parent: EntityId, depth: usize) -> Vec<EntityId> {
        let mut ids = Vec::with_capacity(depth);
        let mut current = parent;
        for level in 0..depth {
            current = self.child(current, &format!("level-{level}")).await.id();
            ids.push(current);
        }
        ids
    }
}
