//! Scenarios against a real PostgreSQL database.
//!
//! Run with `CATALOG_TEST_DATABASE_URL=postgres://... cargo test -- --ignored`.
//! Every test works under its own uniquely named root, so tests can share
//! one database and run in parallel.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinSet;
use uuid::Uuid;

use catalog_core::ErrorKind;
use catalog_core::config::{DatabaseConfig, LimitsConfig};
use catalog_core::types::PrincipalId;
use catalog_database::{DatabasePool, PgCatalog};
use catalog_entity::{
    AccessType, Annotations, ChangeRecord, ChangeType, EntityType, EntityUpdate, NewEntity,
    ObjectType, ResourceAccess,
};
use catalog_service::{CatalogService, RequestContext};

/// Connect to the test database and bring its schema up to date.
async fn pg_pool() -> DatabasePool {
    let url = std::env::var("CATALOG_TEST_DATABASE_URL")
        .expect("CATALOG_TEST_DATABASE_URL must be set for PostgreSQL tests");
    let config = DatabaseConfig {
        url,
        lock_timeout_ms: 2_000,
        ..DatabaseConfig::default()
    };
    let pool = DatabasePool::connect(&config)
        .await
        .expect("Failed to connect to test database");
    pool.migrate().await.expect("Failed to run migrations");
    pool
}

/// Build a service over the migrated test database.
async fn pg_catalog() -> Arc<CatalogService<PgCatalog>> {
    let pool = pg_pool().await;
    Arc::new(CatalogService::new(pool.catalog(), &LimitsConfig::default()).expect("service"))
}

fn unique(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::new_v4().simple())
}

fn ctx() -> RequestContext {
    RequestContext::new(PrincipalId(1))
}

#[tokio::test]
#[ignore]
async fn test_pg_inherited_grant() {
    let svc = pg_catalog().await;
    let a = svc
        .create_entity(&ctx(), NewEntity::new(None, unique("A"), EntityType::Project))
        .await
        .expect("A")
        .id();
    let b = svc
        .create_entity(&ctx(), NewEntity::new(Some(a), "B", EntityType::Folder))
        .await
        .expect("B")
        .id();
    let user_x = BTreeSet::from([PrincipalId(100)]);

    assert!(!svc.can_access(&user_x, b, AccessType::Read).await.expect("before"));
    svc.create_acl(&ctx(), a, vec![ResourceAccess::new(PrincipalId(100), [AccessType::Read])])
        .await
        .expect("grant");
    assert!(svc.can_access(&user_x, b, AccessType::Read).await.expect("after"));
    assert_eq!(svc.get_benefactor(b).await.expect("benefactor"), a);

    svc.delete_entity(&ctx(), a).await.expect("cleanup");
}

#[tokio::test]
#[ignore]
async fn test_pg_stale_etag_and_name_conflict() {
    let svc = pg_catalog().await;
    let root = svc
        .create_entity(&ctx(), NewEntity::new(None, unique("root"), EntityType::Project))
        .await
        .expect("root");
    svc.create_entity(&ctx(), NewEntity::new(Some(root.id()), "taken", EntityType::File))
        .await
        .expect("child");

    let err = svc
        .create_entity(&ctx(), NewEntity::new(Some(root.id()), "taken", EntityType::File))
        .await
        .expect_err("duplicate");
    assert_eq!(err.kind, ErrorKind::NameConflict);

    let stale = EntityUpdate {
        id: root.id(),
        etag: "stale".to_string(),
        name: unique("renamed"),
        alias: None,
        version_label: root.revision.label.clone(),
        version_comment: None,
        content_reference: None,
        annotations: Annotations::new(),
    };
    let err = svc.update_entity(&ctx(), stale).await.expect_err("stale");
    assert_eq!(err.kind, ErrorKind::Conflict);
    assert_eq!(
        svc.get_entity(root.id(), None).await.expect("get").entity.etag,
        root.entity.etag
    );

    svc.delete_entity(&ctx(), root.id()).await.expect("cleanup");
}

#[tokio::test]
#[ignore]
async fn test_pg_reversed_locks_do_not_deadlock() {
    let svc = pg_catalog().await;
    let mut ids = Vec::new();
    for _ in 0..3 {
        ids.push(
            svc.create_entity(&ctx(), NewEntity::new(None, unique("lock"), EntityType::Project))
                .await
                .expect("create")
                .id(),
        );
    }
    let forward = Arc::new(ids.clone());
    let backward = Arc::new(ids.iter().rev().copied().collect::<Vec<_>>());

    for _trial in 0..10 {
        let mut set = JoinSet::new();
        for order in [Arc::clone(&forward), Arc::clone(&backward)] {
            let svc = Arc::clone(&svc);
            set.spawn(async move {
                svc.with_transaction(&ctx(), move |scope| {
                    Box::pin(async move {
                        let locks = scope.lock_entities(&order).await?;
                        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
                        Ok(locks.len())
                    })
                })
                .await
            });
        }
        while let Some(joined) = set.join_next().await {
            assert_eq!(joined.expect("join").expect("no deadlock"), 3);
        }
    }

    for id in ids {
        svc.delete_entity(&ctx(), id).await.expect("cleanup");
    }
}

#[tokio::test]
#[ignore]
async fn test_pg_change_upsert_replaces_row() {
    let svc = pg_catalog().await;
    let object_id = i64::from(Uuid::new_v4().as_fields().0 & 0x7fff_ffff) + 1_000_000_000;

    let first = svc
        .append_change(object_id, ObjectType::Wiki, ChangeType::Create, Some("w1".into()))
        .await
        .expect("first");
    let second = svc
        .append_change(object_id, ObjectType::Wiki, ChangeType::Update, Some("w2".into()))
        .await
        .expect("second");
    assert!(second.change_number > first.change_number);

    let rows: Vec<_> = svc
        .list_changes(first.change_number - 1, Some(ObjectType::Wiki), 1_000)
        .await
        .expect("list")
        .into_iter()
        .filter(|c| c.object_id == object_id)
        .collect();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].object_etag.as_deref(), Some("w2"));

    assert!(svc.delete_change(object_id, ObjectType::Wiki).await.expect("cleanup"));
}

#[tokio::test]
#[ignore]
async fn test_pg_changes_become_visible_in_number_order() {
    let svc = pg_catalog().await;
    let first_id = i64::from(Uuid::new_v4().as_fields().0 & 0x7fff_ffff) + 3_000_000_000;
    let second_id = first_id + 1;
    let ours = |c: &ChangeRecord| c.object_id == first_id || c.object_id == second_id;

    let (appended_tx, appended_rx) = oneshot::channel();
    let (release_tx, release_rx) = oneshot::channel::<()>();
    let holder = tokio::spawn({
        let svc = Arc::clone(&svc);
        async move {
            svc.with_transaction(&ctx(), move |scope| {
                Box::pin(async move {
                    let change = scope
                        .append_change(first_id, ObjectType::Wiki, ChangeType::Create, None)
                        .await?;
                    let _ = appended_tx.send(change.change_number);
                    let _ = release_rx.await;
                    Ok(change)
                })
            })
            .await
        }
    });
    let held_number = appended_rx.await.expect("first append");

    let writer = tokio::spawn({
        let svc = Arc::clone(&svc);
        async move {
            svc.append_change(second_id, ObjectType::Wiki, ChangeType::Create, None)
                .await
        }
    });
    tokio::time::sleep(Duration::from_millis(200)).await;

    // Nothing numbered after the open transaction's change is visible yet.
    let visible: Vec<ChangeRecord> = svc
        .list_changes(held_number - 1, Some(ObjectType::Wiki), 1_000)
        .await
        .expect("list while open")
        .into_iter()
        .filter(|c| ours(c))
        .collect();
    assert!(visible.is_empty(), "saw {visible:?} before the lower number committed");

    release_tx.send(()).expect("release");
    let first = holder.await.expect("holder panicked").expect("first commit");
    let second = writer.await.expect("writer panicked").expect("second append");
    assert!(second.change_number > first.change_number);

    let listed: Vec<i64> = svc
        .list_changes(held_number - 1, Some(ObjectType::Wiki), 1_000)
        .await
        .expect("list after commit")
        .into_iter()
        .filter(|c| ours(c))
        .map(|c| c.change_number)
        .collect();
    assert_eq!(listed, vec![first.change_number, second.change_number]);

    svc.delete_change(first_id, ObjectType::Wiki).await.expect("cleanup");
    svc.delete_change(second_id, ObjectType::Wiki).await.expect("cleanup");
}

#[tokio::test]
#[ignore]
async fn test_pg_status_counts_applied_migrations() {
    let pool = pg_pool().await;
    let status = pool.status().await.expect("status");
    assert!(!status.server_version.is_empty());
    assert!(status.applied_migrations >= 3);
    pool.close().await;
}
