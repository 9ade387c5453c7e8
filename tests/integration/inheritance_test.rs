//! Benefactor resolution and inherited access checks.

use std::collections::BTreeSet;

use catalog_core::ErrorKind;
use catalog_core::types::{EntityId, PrincipalId};
use catalog_entity::{AccessType, ResourceAccess};

use crate::helpers::TestCatalog;

const USER_X: PrincipalId = PrincipalId(100);
const GROUP_Y: PrincipalId = PrincipalId(200);

fn principals(ids: &[PrincipalId]) -> BTreeSet<PrincipalId> {
    ids.iter().copied().collect()
}

#[tokio::test]
async fn test_child_inherits_grant_added_to_root() {
    let app = TestCatalog::new();
    let a = app.root("A").await.id();
    let b = app.child(a, "B").await.id();
    let user_x = principals(&[USER_X]);

    assert!(
        !app.service
            .can_access(&user_x, b, AccessType::Read)
            .await
            .expect("check before grant")
    );

    app.service
        .create_acl(&app.ctx, a, vec![ResourceAccess::new(USER_X, [AccessType::Read])])
        .await
        .expect("grant");

    assert!(
        app.service
            .can_access(&user_x, b, AccessType::Read)
            .await
            .expect("check after grant")
    );
    assert_eq!(app.service.get_benefactor(b).await.expect("benefactor"), a);
}

#[tokio::test]
async fn test_nearest_acl_owner_is_benefactor() {
    let app = TestCatalog::new();
    let root = app.root("root").await.id();
    let chain = app.chain(root, 4).await;
    app.service
        .create_acl(&app.ctx, root, vec![ResourceAccess::new(USER_X, [AccessType::Read])])
        .await
        .expect("root acl");
    app.service
        .create_acl(
            &app.ctx,
            chain[1],
            vec![ResourceAccess::new(GROUP_Y, [AccessType::Read, AccessType::Update])],
        )
        .await
        .expect("inner acl");

    assert_eq!(app.service.get_benefactor(chain[0]).await.expect("b0"), root);
    assert_eq!(app.service.get_benefactor(chain[1]).await.expect("b1"), chain[1]);
    assert_eq!(app.service.get_benefactor(chain[3]).await.expect("b3"), chain[1]);

    // The inner ACL replaces the root's grants, it does not add to them.
    assert!(
        !app.service
            .can_access(&principals(&[USER_X]), chain[3], AccessType::Read)
            .await
            .expect("user")
    );
    assert!(
        app.service
            .can_access(&principals(&[USER_X, GROUP_Y]), chain[3], AccessType::Update)
            .await
            .expect("group")
    );

    assert!(app.service.delete_acl(&app.ctx, chain[1]).await.expect("delete acl"));
    assert_eq!(app.service.get_benefactor(chain[3]).await.expect("b3"), root);
}

#[tokio::test]
async fn test_empty_principal_set_grants_nothing() {
    let app = TestCatalog::new();
    let root = app.root("root").await.id();
    app.service
        .create_acl(&app.ctx, root, vec![ResourceAccess::new(USER_X, [AccessType::Read])])
        .await
        .expect("acl");

    assert!(
        !app.service
            .can_access(&BTreeSet::new(), root, AccessType::Read)
            .await
            .expect("check")
    );
    let err = app
        .service
        .get_non_visible_children(&BTreeSet::new(), root)
        .await
        .expect_err("empty principals");
    assert_eq!(err.kind, ErrorKind::Validation);
}

#[tokio::test]
async fn test_accessible_benefactors_and_hidden_children() {
    let app = TestCatalog::new();
    let root = app.root("root").await.id();
    let open = app.child(root, "open").await.id();
    let locked = app.child(root, "locked").await.id();
    let inherits = app.child(root, "inherits").await.id();

    app.service
        .create_acl(&app.ctx, root, vec![ResourceAccess::new(USER_X, [AccessType::Read])])
        .await
        .expect("root acl");
    app.service
        .create_acl(&app.ctx, open, vec![ResourceAccess::new(USER_X, [AccessType::Read])])
        .await
        .expect("open acl");
    app.service
        .create_acl(&app.ctx, locked, vec![ResourceAccess::new(GROUP_Y, [AccessType::Read])])
        .await
        .expect("locked acl");

    let user_x = principals(&[USER_X]);
    let candidates: BTreeSet<EntityId> = [root, open, locked].into_iter().collect();
    let accessible = app
        .service
        .get_accessible_benefactors(&user_x, &candidates, AccessType::Read)
        .await
        .expect("accessible");
    assert_eq!(accessible, [root, open].into_iter().collect());

    let hidden = app
        .service
        .get_non_visible_children(&user_x, root)
        .await
        .expect("hidden");
    assert_eq!(hidden, BTreeSet::from([locked]));
    assert!(!hidden.contains(&inherits));

    assert_eq!(
        app.service
            .get_principal_ids(locked, AccessType::Read)
            .await
            .expect("principals"),
        BTreeSet::from([GROUP_Y])
    );
}

#[tokio::test]
async fn test_self_parent_is_broken_hierarchy() {
    let app = TestCatalog::new();
    let root = app.root("root").await.id();
    let child = app.child(root, "child").await.id();

    app.service
        .database()
        .force_parent(child, Some(child))
        .expect("corrupt");

    let err = app
        .service
        .get_benefactor(child)
        .await
        .expect_err("self parent");
    assert_eq!(err.kind, ErrorKind::BrokenHierarchy);
}

#[tokio::test]
async fn test_cycle_and_dangling_parent_are_broken_hierarchy() {
    let app = TestCatalog::new();
    let root = app.root("root").await.id();
    let chain = app.chain(root, 3).await;

    // chain[0] -> chain[2] -> chain[1] -> chain[0]
    app.service
        .database()
        .force_parent(chain[0], Some(chain[2]))
        .expect("corrupt");
    let err = app
        .service
        .get_benefactor(chain[2])
        .await
        .expect_err("cycle");
    assert_eq!(err.kind, ErrorKind::BrokenHierarchy);

    app.service
        .database()
        .force_parent(chain[0], Some(EntityId(9_999)))
        .expect("corrupt");
    let err = app
        .service
        .get_benefactor(chain[2])
        .await
        .expect_err("dangling");
    assert_eq!(err.kind, ErrorKind::BrokenHierarchy);
}

#[tokio::test]
async fn test_missing_entity_is_not_found() {
    let app = TestCatalog::new();
    let err = app
        .service
        .get_benefactor(EntityId(42))
        .await
        .expect_err("missing");
    assert_eq!(err.kind, ErrorKind::NotFound);
}
