//! Revisions: snapshots, rollback, labels, and naming rules.

use catalog_core::ErrorKind;
use catalog_core::types::EntityId;
use catalog_entity::{
    AnnotationValue, Annotations, EntityType, EntityUpdate, NewEntity, NewVersion,
    VersionedEntity,
};

use crate::helpers::TestCatalog;

fn stage(value: &str) -> Annotations {
    Annotations::new().with("stage", AnnotationValue::String(vec![value.to_string()]))
}

fn next_version(
    current: &VersionedEntity,
    label: Option<&str>,
    annotations: Option<Annotations>,
) -> NewVersion {
    NewVersion {
        id: current.id(),
        etag: current.entity.etag.clone(),
        label: label.map(str::to_string),
        comment: None,
        content_reference: None,
        annotations,
    }
}

async fn annotated_file(app: &TestCatalog) -> VersionedEntity {
    let mut req = NewEntity::new(None, "data.csv", EntityType::File);
    req.content_reference = Some("s3://bucket/data-v1.csv".to_string());
    req.annotations = stage("raw");
    app.service
        .create_entity(&app.ctx, req)
        .await
        .expect("create")
}

#[tokio::test]
async fn test_deleting_current_version_rolls_back_annotations() {
    let app = TestCatalog::new();
    let v1 = annotated_file(&app).await;
    let v2 = app
        .service
        .create_new_version(&app.ctx, next_version(&v1, None, Some(stage("clean"))))
        .await
        .expect("version 2");
    assert_eq!(v2.version_number(), 2);
    assert_eq!(v2.revision.label, "2");
    assert_eq!(v2.revision.annotations, stage("clean"));

    let rolled_back = app
        .service
        .delete_version(&app.ctx, v1.id(), 2)
        .await
        .expect("delete v2");
    assert_eq!(rolled_back.entity.current_version, 1);
    assert_eq!(rolled_back.revision.annotations, v1.revision.annotations);

    let current = app.service.get_entity(v1.id(), None).await.expect("get");
    assert_eq!(current.revision.annotations, stage("raw"));
    assert_eq!(
        app.service.get_version_numbers(v1.id()).await.expect("numbers"),
        vec![1]
    );
}

#[tokio::test]
async fn test_deleted_version_number_is_not_reused() {
    let app = TestCatalog::new();
    let v1 = annotated_file(&app).await;
    let v2 = app
        .service
        .create_new_version(&app.ctx, next_version(&v1, None, None))
        .await
        .expect("version 2");
    let rolled_back = app
        .service
        .delete_version(&app.ctx, v2.id(), 2)
        .await
        .expect("delete v2");
    assert_eq!(rolled_back.entity.max_version, 2);

    let v3 = app
        .service
        .create_new_version(&app.ctx, next_version(&rolled_back, None, None))
        .await
        .expect("version 3");
    assert_eq!(v3.version_number(), 3);
    assert_eq!(v3.revision.label, "3");
    assert_eq!(v3.entity.max_version, 3);
    assert_eq!(
        app.service.get_version_numbers(v1.id()).await.expect("numbers"),
        vec![3, 1]
    );
}

#[tokio::test]
async fn test_new_version_carries_content_forward() {
    let app = TestCatalog::new();
    let v1 = annotated_file(&app).await;
    let v2 = app
        .service
        .create_new_version(&app.ctx, next_version(&v1, Some("cleaned"), None))
        .await
        .expect("version 2");

    assert_eq!(v2.revision.label, "cleaned");
    assert_eq!(v2.revision.content_reference, v1.revision.content_reference);
    assert_eq!(v2.revision.annotations, v1.revision.annotations);
    assert_ne!(v2.entity.etag, v1.entity.etag);

    let old = app.service.get_entity(v1.id(), Some(1)).await.expect("v1");
    assert!(!old.is_current());
    assert_eq!(old.revision, v1.revision);
    assert_eq!(
        app.service.get_version_numbers(v1.id()).await.expect("numbers"),
        vec![2, 1]
    );
}

#[tokio::test]
async fn test_duplicate_label_and_stale_etag_conflict() {
    let app = TestCatalog::new();
    let v1 = annotated_file(&app).await;

    let err = app
        .service
        .create_new_version(&app.ctx, next_version(&v1, Some("1"), None))
        .await
        .expect_err("label taken");
    assert_eq!(err.kind, ErrorKind::Conflict);

    app.service
        .create_new_version(&app.ctx, next_version(&v1, None, None))
        .await
        .expect("version 2");
    let err = app
        .service
        .create_new_version(&app.ctx, next_version(&v1, None, None))
        .await
        .expect_err("stale etag");
    assert_eq!(err.kind, ErrorKind::Conflict);
    assert_eq!(
        app.service.list_versions(v1.id()).await.expect("versions").len(),
        2
    );
}

#[tokio::test]
async fn test_last_version_cannot_be_deleted() {
    let app = TestCatalog::new();
    let v1 = annotated_file(&app).await;

    let err = app
        .service
        .delete_version(&app.ctx, v1.id(), 1)
        .await
        .expect_err("only version");
    assert_eq!(err.kind, ErrorKind::Validation);

    let err = app
        .service
        .delete_version(&app.ctx, v1.id(), 9)
        .await
        .expect_err("no such version");
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[tokio::test]
async fn test_deleting_old_version_keeps_current() {
    let app = TestCatalog::new();
    let v1 = annotated_file(&app).await;
    let v2 = app
        .service
        .create_new_version(&app.ctx, next_version(&v1, None, Some(stage("clean"))))
        .await
        .expect("version 2");

    let after = app
        .service
        .delete_version(&app.ctx, v1.id(), 1)
        .await
        .expect("delete v1");
    assert_eq!(after.entity.current_version, 2);
    assert_eq!(after.revision.annotations, v2.revision.annotations);

    let err = app
        .service
        .get_entity(v1.id(), Some(1))
        .await
        .expect_err("v1 gone");
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[tokio::test]
async fn test_sibling_names_and_aliases_conflict_distinctly() {
    let app = TestCatalog::new();
    let root = app.root("root").await.id();
    let mut first = NewEntity::new(Some(root), "report", EntityType::File);
    first.alias = Some("report_alias".to_string());
    let first = app.service.create_entity(&app.ctx, first).await.expect("first");

    let err = app
        .service
        .create_entity(&app.ctx, NewEntity::new(Some(root), "report", EntityType::File))
        .await
        .expect_err("same name");
    assert_eq!(err.kind, ErrorKind::NameConflict);

    let mut aliased = NewEntity::new(Some(root), "other", EntityType::File);
    aliased.alias = Some("report_alias".to_string());
    let err = app
        .service
        .create_entity(&app.ctx, aliased)
        .await
        .expect_err("same alias");
    assert_eq!(err.kind, ErrorKind::NameConflict);

    // The same name under another parent is fine.
    let elsewhere = app.root("elsewhere").await.id();
    app.service
        .create_entity(&app.ctx, NewEntity::new(Some(elsewhere), "report", EntityType::File))
        .await
        .expect("other parent");

    let found = app
        .service
        .get_entity_by_alias(Some(root), "report_alias")
        .await
        .expect("by alias");
    assert_eq!(found.id, first.id());
}

#[tokio::test]
async fn test_invalid_input_is_rejected_before_writing() {
    let app = TestCatalog::new();

    let err = app
        .service
        .create_entity(&app.ctx, NewEntity::new(None, "bad/name", EntityType::Project))
        .await
        .expect_err("bad name");
    assert_eq!(err.kind, ErrorKind::Validation);

    let err = app
        .service
        .create_entity(
            &app.ctx,
            NewEntity::new(Some(EntityId(404)), "orphan", EntityType::Folder),
        )
        .await
        .expect_err("missing parent");
    assert_eq!(err.kind, ErrorKind::NotFound);

    assert_eq!(app.service.change_count().await.expect("count"), 0);
}

#[tokio::test]
async fn test_update_and_move_keep_paths_consistent() {
    let app = TestCatalog::new();
    let root = app.root("root").await.id();
    let left = app.child(root, "left").await.id();
    let right = app.child(root, "right").await.id();
    let leaf = app.child(left, "leaf").await;

    let moved = app
        .service
        .move_entity(&app.ctx, leaf.id(), right, &leaf.entity.etag)
        .await
        .expect("move");
    let path: Vec<EntityId> = app
        .service
        .get_entity_path(leaf.id())
        .await
        .expect("path")
        .iter()
        .map(|h| h.id)
        .collect();
    assert_eq!(path, vec![root, right, leaf.id()]);

    let right_etag = app.service.peek_etag(right).await.expect("etag");
    let err = app
        .service
        .move_entity(&app.ctx, right, leaf.id(), &right_etag)
        .await
        .expect_err("beneath own descendant");
    assert_eq!(err.kind, ErrorKind::Validation);
    assert_eq!(
        app.service.get_children(left).await.expect("children"),
        Vec::new()
    );

    let renamed = app
        .service
        .update_entity(
            &app.ctx,
            EntityUpdate {
                id: leaf.id(),
                etag: moved.entity.etag.clone(),
                name: "leaf-renamed".to_string(),
                alias: None,
                version_label: moved.revision.label.clone(),
                version_comment: Some("renamed".to_string()),
                content_reference: None,
                annotations: Annotations::new(),
            },
        )
        .await
        .expect("update");
    assert_eq!(renamed.entity.name, "leaf-renamed");
    assert_eq!(
        app.service
            .get_child_by_name(Some(right), "leaf-renamed")
            .await
            .expect("by name")
            .id,
        leaf.id()
    );
}
