//! Change-log upserts, listing, batches, and delivery tracking.

use catalog_core::ErrorKind;
use catalog_core::config::LimitsConfig;
use catalog_entity::{ChangeRecord, ChangeType, ObjectType};

use crate::helpers::TestCatalog;

fn etag(s: &str) -> Option<String> {
    Some(s.to_string())
}

#[tokio::test]
async fn test_append_is_idempotent_per_object() {
    let app = TestCatalog::new();
    let first = app
        .service
        .append_change(1_000, ObjectType::Entity, ChangeType::Create, etag("e1"))
        .await
        .expect("first");
    let second = app
        .service
        .append_change(1_000, ObjectType::Entity, ChangeType::Update, etag("e2"))
        .await
        .expect("second");
    assert!(second.change_number > first.change_number);

    let rows: Vec<ChangeRecord> = app
        .service
        .list_changes(0, None, 100)
        .await
        .expect("list")
        .into_iter()
        .filter(|c| c.object_id == 1_000 && c.object_type == ObjectType::Entity)
        .collect();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].change_number, second.change_number);
    assert_eq!(rows[0].object_etag.as_deref(), Some("e2"));

    // Same id, different type, is a separate row.
    app.service
        .append_change(1_000, ObjectType::AccessControlList, ChangeType::Create, etag("a1"))
        .await
        .expect("acl change");
    assert_eq!(app.service.change_count().await.expect("count"), 2);
}

#[tokio::test]
async fn test_etag_presence_is_validated() {
    let app = TestCatalog::new();
    let err = app
        .service
        .append_change(1, ObjectType::Entity, ChangeType::Update, None)
        .await
        .expect_err("update without etag");
    assert_eq!(err.kind, ErrorKind::Validation);

    let err = app
        .service
        .append_change(1, ObjectType::Entity, ChangeType::Delete, etag("x"))
        .await
        .expect_err("delete with etag");
    assert_eq!(err.kind, ErrorKind::Validation);

    let deleted = app
        .service
        .append_change(1, ObjectType::Entity, ChangeType::Delete, None)
        .await
        .expect("delete");
    assert_eq!(deleted.object_etag, None);
    assert_eq!(
        app.service
            .get_change_etag(1, ObjectType::Entity)
            .await
            .expect("etag"),
        None
    );
}

#[tokio::test]
async fn test_batch_numbers_follow_canonical_order() {
    let app = TestCatalog::new();
    let batch = vec![
        ChangeRecord::pending(30, ObjectType::AccessControlList, ChangeType::Update, etag("a")),
        ChangeRecord::pending(7, ObjectType::Wiki, ChangeType::Create, etag("b")),
        ChangeRecord::pending(12, ObjectType::Entity, ChangeType::Update, etag("c")),
        ChangeRecord::pending(4, ObjectType::AccessControlList, ChangeType::Delete, None),
        ChangeRecord::pending(2, ObjectType::Entity, ChangeType::Create, etag("d")),
    ];

    let stored = app.service.append_changes(batch).await.expect("batch");

    let mut by_number = stored.clone();
    by_number.sort_by_key(|c| c.change_number);
    let mut by_key = stored.clone();
    by_key.sort_by_key(ChangeRecord::sort_key);
    assert_eq!(by_number, by_key);
    assert_eq!(stored, by_key);

    let listed = app.service.list_changes(0, None, 100).await.expect("list");
    assert_eq!(listed, by_number);
}

#[tokio::test]
async fn test_invalid_batch_writes_nothing() {
    let app = TestCatalog::new();
    let batch = vec![
        ChangeRecord::pending(1, ObjectType::Entity, ChangeType::Create, etag("ok")),
        ChangeRecord::pending(2, ObjectType::Entity, ChangeType::Update, None),
    ];
    let err = app.service.append_changes(batch).await.expect_err("invalid");
    assert_eq!(err.kind, ErrorKind::Validation);
    assert_eq!(app.service.change_count().await.expect("count"), 0);
}

#[tokio::test]
async fn test_listing_resumes_after_observed_number() {
    let app = TestCatalog::with_limits(LimitsConfig {
        change_list_max_limit: 3,
        ..LimitsConfig::default()
    });
    let mut numbers = Vec::new();
    for id in 1..=6 {
        let object_type = if id % 2 == 0 {
            ObjectType::AccessControlList
        } else {
            ObjectType::Entity
        };
        let change = app
            .service
            .append_change(id, object_type, ChangeType::Create, etag("e"))
            .await
            .expect("append");
        numbers.push(change.change_number);
    }

    let capped = app.service.list_changes(0, None, 100).await.expect("capped");
    assert_eq!(capped.len(), 3);

    let resumed = app
        .service
        .list_changes(numbers[2], None, 3)
        .await
        .expect("resumed");
    let resumed_numbers: Vec<i64> = resumed.iter().map(|c| c.change_number).collect();
    assert_eq!(resumed_numbers, numbers[3..].to_vec());

    let acls = app
        .service
        .list_changes(0, Some(ObjectType::AccessControlList), 3)
        .await
        .expect("filtered");
    assert!(acls.iter().all(|c| c.object_type == ObjectType::AccessControlList));
    assert_eq!(acls.len(), 3);

    let err = app
        .service
        .list_changes(0, None, -1)
        .await
        .expect_err("negative limit");
    assert_eq!(err.kind, ErrorKind::Validation);

    assert_eq!(
        app.service.minimum_change_number().await.expect("min"),
        Some(numbers[0])
    );
    assert_eq!(
        app.service.current_change_number().await.expect("max"),
        Some(numbers[5])
    );
}

#[tokio::test]
async fn test_superseded_object_moves_to_the_end() {
    let app = TestCatalog::new();
    let a = app
        .service
        .append_change(1, ObjectType::Entity, ChangeType::Create, etag("a1"))
        .await
        .expect("a");
    app.service
        .append_change(2, ObjectType::Entity, ChangeType::Create, etag("b1"))
        .await
        .expect("b");
    app.service
        .append_change(1, ObjectType::Entity, ChangeType::Update, etag("a2"))
        .await
        .expect("a again");

    let listed = app
        .service
        .list_changes(a.change_number - 1, None, 10)
        .await
        .expect("list");
    let ids: Vec<i64> = listed.iter().map(|c| c.object_id).collect();
    assert_eq!(ids, vec![2, 1]);
}

#[tokio::test]
async fn test_unsent_tracks_delivered_form() {
    let app = TestCatalog::new();
    for id in 1..=3 {
        app.service
            .append_change(id, ObjectType::Entity, ChangeType::Create, etag("v1"))
            .await
            .expect("append");
    }
    let unsent = app.service.list_unsent(10).await.expect("unsent");
    assert_eq!(unsent.len(), 3);

    app.service.register_sent(&unsent[..2]).await.expect("sent");
    let remaining = app.service.list_unsent(10).await.expect("unsent");
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].object_id, 3);

    app.service
        .append_change(1, ObjectType::Entity, ChangeType::Update, etag("v2"))
        .await
        .expect("re-append");
    let remaining = app.service.list_unsent(10).await.expect("unsent");
    let ids: Vec<i64> = remaining.iter().map(|c| c.object_id).collect();
    assert_eq!(ids, vec![3, 1]);
}

#[tokio::test]
async fn test_purge_and_delete_remove_rows() {
    let app = TestCatalog::new();
    app.service
        .append_change(1, ObjectType::Entity, ChangeType::Create, etag("a"))
        .await
        .expect("a");
    app.service
        .append_change(2, ObjectType::Entity, ChangeType::Create, etag("b"))
        .await
        .expect("b");

    assert!(app.service.delete_change(1, ObjectType::Entity).await.expect("delete"));
    assert!(!app.service.delete_change(1, ObjectType::Entity).await.expect("again"));
    let err = app
        .service
        .get_change_etag(1, ObjectType::Entity)
        .await
        .expect_err("gone");
    assert_eq!(err.kind, ErrorKind::NotFound);

    assert_eq!(app.service.purge_changes().await.expect("purge"), 1);
    assert_eq!(app.service.change_count().await.expect("count"), 0);
    assert_eq!(app.service.minimum_change_number().await.expect("min"), None);
}
