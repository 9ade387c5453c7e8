//! Lock ordering, eTag compare-and-swap, and lock timeouts.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Barrier;
use tokio::task::JoinSet;

use catalog_core::types::{EntityId, PrincipalId};
use catalog_core::{AppError, AppResult, ErrorKind};
use catalog_database::EntityRows;
use catalog_entity::{Annotations, Entity, EntityHeader, EntityUpdate, LineageLink};
use catalog_service::RequestContext;

use crate::helpers::TestCatalog;

fn rename(id: EntityId, etag: &str, name: &str) -> EntityUpdate {
    EntityUpdate {
        id,
        etag: etag.to_string(),
        name: name.to_string(),
        alias: None,
        version_label: "1".to_string(),
        version_comment: None,
        content_reference: None,
        annotations: Annotations::new(),
    }
}

#[tokio::test]
async fn test_batch_lock_acquires_in_ascending_order() {
    let app = TestCatalog::new();
    for i in 1..=8 {
        app.root(&format!("e{i}")).await;
    }

    let locks = app
        .service
        .lock_entities(&[EntityId(5), EntityId(2), EntityId(8)])
        .await
        .expect("lock");
    let order: Vec<EntityId> = locks.iter().map(|l| l.id).collect();
    assert_eq!(order, vec![EntityId(2), EntityId(5), EntityId(8)]);

    let reversed = app
        .service
        .lock_entities(&[EntityId(8), EntityId(5), EntityId(2)])
        .await
        .expect("lock");
    assert_eq!(locks, reversed);
}

#[tokio::test]
async fn test_batch_lock_on_missing_entity_is_not_found() {
    let app = TestCatalog::new();
    let a = app.root("a").await.id();
    let err = app
        .service
        .lock_entities(&[a, EntityId(77)])
        .await
        .expect_err("missing");
    assert_eq!(err.kind, ErrorKind::NotFound);
}

const LOCK_STEP: Duration = Duration::from_millis(25);

/// Row access that pauses after every lock it takes, so two transactions
/// interleave their acquisitions instead of running one after the other.
struct SteppedLocks<'a, T> {
    inner: &'a mut T,
}

#[async_trait]
impl<'a, T: EntityRows> EntityRows for SteppedLocks<'a, T> {
    async fn next_entity_id(&mut self) -> AppResult<EntityId> {
        self.inner.next_entity_id().await
    }

    async fn insert_entity(&mut self, entity: &Entity) -> AppResult<()> {
        self.inner.insert_entity(entity).await
    }

    async fn find_entity(&mut self, id: EntityId) -> AppResult<Option<Entity>> {
        self.inner.find_entity(id).await
    }

    async fn lock_entity(&mut self, id: EntityId) -> AppResult<Option<String>> {
        let etag = self.inner.lock_entity(id).await?;
        tokio::time::sleep(LOCK_STEP).await;
        Ok(etag)
    }

    async fn peek_entity_etag(&mut self, id: EntityId) -> AppResult<Option<String>> {
        self.inner.peek_entity_etag(id).await
    }

    async fn update_entity(&mut self, entity: &Entity) -> AppResult<()> {
        self.inner.update_entity(entity).await
    }

    async fn delete_entity(&mut self, id: EntityId) -> AppResult<bool> {
        self.inner.delete_entity(id).await
    }

    async fn find_child_by_name(
        &mut self,
        parent_id: Option<EntityId>,
        name: &str,
    ) -> AppResult<Option<Entity>> {
        self.inner.find_child_by_name(parent_id, name).await
    }

    async fn find_child_by_alias(
        &mut self,
        parent_id: Option<EntityId>,
        alias: &str,
    ) -> AppResult<Option<Entity>> {
        self.inner.find_child_by_alias(parent_id, alias).await
    }

    async fn list_children(&mut self, parent_id: EntityId) -> AppResult<Vec<EntityHeader>> {
        self.inner.list_children(parent_id).await
    }

    async fn lineage(&mut self, id: EntityId, max_links: usize) -> AppResult<Vec<LineageLink>> {
        self.inner.lineage(id, max_links).await
    }
}

/// Run two transactions at once, one locking `ids` forward and one
/// backward, pausing after every lock. `ordered` routes the batch through
/// the controller; otherwise rows are locked in the order given.
async fn race_reversed_locks(
    app: &TestCatalog,
    ids: &[EntityId],
    ordered: bool,
) -> Vec<AppResult<usize>> {
    let forward = ids.to_vec();
    let backward: Vec<EntityId> = ids.iter().rev().copied().collect();
    let barrier = Arc::new(Barrier::new(2));

    let mut set = JoinSet::new();
    for order in [forward, backward] {
        let service = Arc::clone(&app.service);
        let barrier = Arc::clone(&barrier);
        set.spawn(async move {
            let ctx = RequestContext::new(PrincipalId(1));
            service
                .with_transaction(&ctx, move |scope| {
                    Box::pin(async move {
                        let (tx, components, _) = scope.parts();
                        let mut stepped = SteppedLocks { inner: tx };
                        barrier.wait().await;
                        if ordered {
                            let locks = components
                                .controller
                                .lock_entities(&mut stepped, &order)
                                .await?;
                            return Ok(locks.len());
                        }
                        for id in &order {
                            stepped.lock_entity(*id).await?;
                        }
                        Ok(order.len())
                    })
                })
                .await
        });
    }

    let mut results = Vec::new();
    while let Some(joined) = set.join_next().await {
        results.push(joined.expect("task panicked"));
    }
    results
}

async fn three_roots(app: &TestCatalog) -> Vec<EntityId> {
    let mut ids = Vec::new();
    for name in ["x", "y", "z"] {
        ids.push(app.root(name).await.id());
    }
    ids
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_reversed_concurrent_batch_locks_never_deadlock() {
    let app = TestCatalog::with_lock_timeout(Duration::from_millis(500));
    let ids = three_roots(&app).await;

    for _trial in 0..5 {
        for result in race_reversed_locks(&app, &ids, true).await {
            assert_eq!(result.expect("lock must not time out"), 3);
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_unordered_reversed_locks_time_out() {
    let app = TestCatalog::with_lock_timeout(Duration::from_millis(500));
    let ids = three_roots(&app).await;

    let results = race_reversed_locks(&app, &ids, false).await;
    let timed_out: Vec<&AppError> = results.iter().filter_map(|r| r.as_ref().err()).collect();
    assert!(!timed_out.is_empty(), "interleaved reversed locks must collide");
    for err in timed_out {
        assert_eq!(err.kind, ErrorKind::LockTimeout);
        assert!(err.is_retryable());
    }
}

#[tokio::test]
async fn test_stale_etag_is_conflict_and_mutates_nothing() {
    let app = TestCatalog::new();
    let original = app.root("original").await;
    let id = original.id();
    let changes_before = app.service.current_change_number().await.expect("current");

    let err = app
        .service
        .update_entity(&app.ctx, rename(id, "not-the-etag", "renamed"))
        .await
        .expect_err("stale etag");
    assert_eq!(err.kind, ErrorKind::Conflict);

    let stored = app.service.get_entity(id, None).await.expect("get");
    assert_eq!(stored, original);
    assert_eq!(
        app.service.current_change_number().await.expect("current"),
        changes_before
    );
}

#[tokio::test]
async fn test_second_writer_with_first_etag_loses() {
    let app = TestCatalog::new();
    let original = app.root("shared").await;
    let etag = original.entity.etag.clone();

    let first = app
        .service
        .update_entity(&app.ctx, rename(original.id(), &etag, "first"))
        .await
        .expect("first writer");
    assert_ne!(first.entity.etag, etag);

    let err = app
        .service
        .update_entity(&app.ctx, rename(original.id(), &etag, "second"))
        .await
        .expect_err("second writer");
    assert_eq!(err.kind, ErrorKind::Conflict);
    assert_eq!(
        app.service
            .get_entity(original.id(), None)
            .await
            .expect("get")
            .entity
            .name,
        "first"
    );
}

#[tokio::test]
async fn test_held_lock_times_out_as_retryable() {
    let app = TestCatalog::with_lock_timeout(Duration::from_millis(100));
    let id = app.root("busy").await.id();
    let (locked_tx, locked_rx) = tokio::sync::oneshot::channel::<()>();
    let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();

    let holder = {
        let service = Arc::clone(&app.service);
        tokio::spawn(async move {
            let ctx = RequestContext::new(PrincipalId(1));
            service
                .with_transaction(&ctx, move |scope| {
                    Box::pin(async move {
                        scope.lock_entities(&[id]).await?;
                        let _ = locked_tx.send(());
                        let _ = release_rx.await;
                        Ok(())
                    })
                })
                .await
        })
    };

    locked_rx.await.expect("holder locked");
    let err = app
        .service
        .lock_entities(&[id])
        .await
        .expect_err("lock is held");
    assert_eq!(err.kind, ErrorKind::LockTimeout);
    assert!(err.is_retryable());

    release_tx.send(()).expect("release");
    holder.await.expect("join").expect("holder commits");
    assert_eq!(app.service.lock_entities(&[id]).await.expect("relock").len(), 1);
}
