//! Cascading deletes and the cascade depth limit.

use catalog_core::ErrorKind;
use catalog_core::config::LimitsConfig;
use catalog_core::types::PrincipalId;
use catalog_entity::{AccessType, ChangeType, NewVersion, ObjectType, ResourceAccess};

use crate::helpers::TestCatalog;

fn cascade_limit(depth: u32) -> LimitsConfig {
    LimitsConfig {
        max_cascade_depth: depth,
        ..LimitsConfig::default()
    }
}

#[tokio::test]
async fn test_cascade_over_limit_is_rejected_whole() {
    let app = TestCatalog::with_limits(cascade_limit(15));
    let a = app.root("A").await.id();
    let descendants = app.chain(a, 16).await;
    let changes_before = app.service.change_count().await.expect("count");
    let current_before = app.service.current_change_number().await.expect("current");

    let err = app
        .service
        .delete_entity(&app.ctx, a)
        .await
        .expect_err("cascade too deep");
    assert_eq!(err.kind, ErrorKind::LimitExceeded);

    app.service.get_entity(a, None).await.expect("A intact");
    for id in &descendants {
        app.service.get_entity(*id, None).await.expect("descendant intact");
    }
    assert_eq!(descendants.len() + 1, 17);
    assert_eq!(app.service.change_count().await.expect("count"), changes_before);
    assert_eq!(
        app.service.current_change_number().await.expect("current"),
        current_before
    );
}

#[tokio::test]
async fn test_cascade_at_limit_removes_everything() {
    let app = TestCatalog::with_limits(cascade_limit(15));
    let a = app.root("A").await.id();
    let descendants = app.chain(a, 15).await;
    let side = app.child(a, "side").await;
    app.service
        .create_acl(
            &app.ctx,
            descendants[3],
            vec![ResourceAccess::new(PrincipalId(5), [AccessType::Read])],
        )
        .await
        .expect("acl");
    app.service
        .create_new_version(
            &app.ctx,
            NewVersion {
                id: side.id(),
                etag: side.entity.etag.clone(),
                label: None,
                comment: Some("second".to_string()),
                content_reference: None,
                annotations: None,
            },
        )
        .await
        .expect("version 2");

    let removed = app.service.delete_entity(&app.ctx, a).await.expect("delete");
    assert_eq!(removed, 17);

    for id in descendants.iter().chain([a, side.id()].iter()) {
        let err = app.service.get_entity(*id, None).await.expect_err("gone");
        assert_eq!(err.kind, ErrorKind::NotFound);
    }
    let err = app
        .service
        .get_acl(descendants[3])
        .await
        .expect_err("acl gone");
    assert_eq!(err.kind, ErrorKind::NotFound);

    let deleted = app
        .service
        .list_changes(0, Some(ObjectType::Entity), 1_000)
        .await
        .expect("changes")
        .into_iter()
        .find(|c| c.object_id == a.value())
        .expect("delete recorded");
    assert_eq!(deleted.change_type, ChangeType::Delete);
    assert_eq!(deleted.object_etag, None);
}

#[tokio::test]
async fn test_deleting_leaf_leaves_siblings() {
    let app = TestCatalog::new();
    let root = app.root("root").await.id();
    let keep = app.child(root, "keep").await.id();
    let drop = app.child(root, "drop").await.id();

    assert_eq!(app.service.delete_entity(&app.ctx, drop).await.expect("delete"), 1);

    let children = app.service.get_children(root).await.expect("children");
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].id, keep);
}
