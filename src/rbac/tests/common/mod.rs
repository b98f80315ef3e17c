//! Shared fixtures for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use cretoai_rbac::{
    CascadeStore, CascadeTransaction, CoordinatorConfig, InMemoryPolicyBackend, MemoryStore,
    Permission, PolicyBackend, PolicyOpKind, RbacError, Result, Role, RoleCoordinator,
};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Policy backend that logs each call before delegating to an in-memory backend
pub struct RecordingPolicyBackend {
    inner: InMemoryPolicyBackend,
    calls: Mutex<Vec<(PolicyOpKind, String)>>,
}

impl RecordingPolicyBackend {
    pub fn new(store: MemoryStore) -> Self {
        Self {
            inner: InMemoryPolicyBackend::new(Arc::new(store)),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn inner(&self) -> &InMemoryPolicyBackend {
        &self.inner
    }

    pub async fn calls(&self) -> Vec<(PolicyOpKind, String)> {
        self.calls.lock().await.clone()
    }

    /// Number of `kind` calls made for `permission_id`
    pub async fn count(&self, kind: PolicyOpKind, permission_id: &str) -> usize {
        self.calls
            .lock()
            .await
            .iter()
            .filter(|(k, id)| *k == kind && id == permission_id)
            .count()
    }

    async fn log(&self, kind: PolicyOpKind, permission: &Permission) {
        self.calls.lock().await.push((kind, permission.id()));
    }
}

#[async_trait]
impl PolicyBackend for RecordingPolicyBackend {
    async fn add_grouping_policies(&self, permission: &Permission) -> Result<()> {
        self.log(PolicyOpKind::AddGrouping, permission).await;
        self.inner.add_grouping_policies(permission).await
    }

    async fn remove_grouping_policies(&self, permission: &Permission) -> Result<()> {
        self.log(PolicyOpKind::RemoveGrouping, permission).await;
        self.inner.remove_grouping_policies(permission).await
    }

    async fn add_policies(&self, permission: &Permission) -> Result<()> {
        self.log(PolicyOpKind::AddPolicies, permission).await;
        self.inner.add_policies(permission).await
    }

    async fn remove_policies(&self, permission: &Permission) -> Result<()> {
        self.log(PolicyOpKind::RemovePolicies, permission).await;
        self.inner.remove_policies(permission).await
    }
}

/// Cascade store whose transactions fail on the first permission write
pub struct FailingCascadeStore {
    inner: MemoryStore,
}

impl FailingCascadeStore {
    pub fn new(inner: MemoryStore) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl CascadeStore for FailingCascadeStore {
    async fn begin(&self) -> Result<Box<dyn CascadeTransaction>> {
        let inner = self.inner.begin().await?;
        Ok(Box::new(FailingTransaction { inner }))
    }
}

struct FailingTransaction {
    inner: Box<dyn CascadeTransaction>,
}

#[async_trait]
impl CascadeTransaction for FailingTransaction {
    async fn find_all_roles(&mut self) -> Result<Vec<Role>> {
        self.inner.find_all_roles().await
    }

    async fn update_role(&mut self, role: &Role) -> Result<()> {
        self.inner.update_role(role).await
    }

    async fn find_all_permissions(&mut self) -> Result<Vec<Permission>> {
        self.inner.find_all_permissions().await
    }

    async fn update_permission(&mut self, _permission: &Permission) -> Result<()> {
        Err(RbacError::Database("connection reset".to_string()))
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.inner.commit().await
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.inner.rollback().await
    }
}

/// Coordinator over `store` with a recording backend
pub fn recording_coordinator(store: &MemoryStore) -> (RoleCoordinator, Arc<RecordingPolicyBackend>) {
    let backend = Arc::new(RecordingPolicyBackend::new(store.clone()));
    let shared = Arc::new(store.clone());
    let coordinator = RoleCoordinator::new(
        shared.clone(),
        shared.clone(),
        shared,
        backend.clone(),
        CoordinatorConfig::default(),
    );
    (coordinator, backend)
}

/// Coordinator whose rename cascades always fail
pub fn failing_cascade_coordinator(
    store: &MemoryStore,
    config: CoordinatorConfig,
) -> (RoleCoordinator, Arc<RecordingPolicyBackend>) {
    let backend = Arc::new(RecordingPolicyBackend::new(store.clone()));
    let shared = Arc::new(store.clone());
    let coordinator = RoleCoordinator::new(
        shared.clone(),
        shared,
        Arc::new(FailingCascadeStore::new(store.clone())),
        backend.clone(),
        config,
    );
    (coordinator, backend)
}

/// Permission granting `action` on `resource` to `role_id`
pub fn grant(owner: &str, name: &str, role_id: &str) -> Permission {
    Permission::new(owner, name)
        .with_role(role_id)
        .with_resource("doc")
        .with_action("read")
}
