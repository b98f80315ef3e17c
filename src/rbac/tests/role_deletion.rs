//! Role deletion integration tests

mod common;

use common::{grant, recording_coordinator};
use cretoai_rbac::{MemoryStore, PermissionStore, PolicyBackend, PolicyOpKind, Role, RoleStore};

fn fixture() -> MemoryStore {
    MemoryStore::with_rows(
        vec![
            Role::new("acme", "auditor").with_user("acme/alice"),
            Role::new("acme", "admin")
                .with_user("acme/bob")
                .with_sub_role("acme/auditor"),
        ],
        vec![
            grant("acme", "p1", "acme/auditor"),
            grant("acme", "p2", "acme/auditor").with_role("acme/admin"),
            grant("acme", "p3", "acme/admin"),
        ],
    )
}

#[tokio::test]
async fn test_delete_scrubs_role_from_permissions() {
    let store = fixture();
    let (coordinator, _backend) = recording_coordinator(&store);

    let p3_before = store.get_permission("acme/p3").await.unwrap().unwrap();

    let auditor = store.get("acme", "auditor").await.unwrap().unwrap();
    assert!(coordinator.delete_role(&auditor).await.unwrap());

    assert!(store.get("acme", "auditor").await.unwrap().is_none());

    let p1 = store.get_permission("acme/p1").await.unwrap().unwrap();
    assert!(p1.roles.is_empty());

    let p2 = store.get_permission("acme/p2").await.unwrap().unwrap();
    assert_eq!(p2.roles, vec!["acme/admin"]);

    let p3 = store.get_permission("acme/p3").await.unwrap().unwrap();
    assert_eq!(p3, p3_before);
}

#[tokio::test]
async fn test_delete_leaves_sub_role_edges() {
    let store = fixture();
    let (coordinator, _backend) = recording_coordinator(&store);

    let auditor = store.get("acme", "auditor").await.unwrap().unwrap();
    coordinator.delete_role(&auditor).await.unwrap();

    let admin = store.get("acme", "admin").await.unwrap().unwrap();
    assert_eq!(admin.roles, vec!["acme/auditor"]);
}

#[tokio::test]
async fn test_delete_resyncs_scrubbed_permissions_only() {
    let store = fixture();
    let (coordinator, backend) = recording_coordinator(&store);
    for permission in PermissionStore::find_all(&store).await.unwrap() {
        backend.inner().add_grouping_policies(&permission).await.unwrap();
        backend.inner().add_policies(&permission).await.unwrap();
    }
    assert!(backend.inner().has_grouping("acme/alice", "acme/auditor").await);

    let auditor = store.get("acme", "auditor").await.unwrap().unwrap();
    coordinator.delete_role(&auditor).await.unwrap();

    assert_eq!(backend.count(PolicyOpKind::RemoveGrouping, "acme/p1").await, 1);
    assert_eq!(backend.count(PolicyOpKind::AddPolicies, "acme/p2").await, 1);
    assert_eq!(backend.count(PolicyOpKind::RemoveGrouping, "acme/p3").await, 0);

    assert!(!backend.inner().has_grouping("acme/alice", "acme/auditor").await);
    assert!(backend.inner().has_grouping("acme/bob", "acme/admin").await);

    let subjects: Vec<String> = backend
        .inner()
        .policy_tuples()
        .await
        .into_iter()
        .map(|t| t.subject)
        .collect();
    assert!(!subjects.iter().any(|s| s == "acme/auditor"));
    assert!(subjects.iter().any(|s| s == "acme/admin"));
}

#[tokio::test]
async fn test_delete_missing_role_reports_false() {
    let store = fixture();
    let (coordinator, _backend) = recording_coordinator(&store);

    let ghost = Role::new("acme", "ghost");
    assert!(!coordinator.delete_role(&ghost).await.unwrap());
    assert_eq!(store.write_count(), 0);
    assert_eq!(coordinator.metrics().await.role_deletes, 1);
}
