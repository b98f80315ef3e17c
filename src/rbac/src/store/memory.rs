//! In-memory role and permission store

use super::{CascadeStore, CascadeTransaction, PermissionStore, RoleStore};
use crate::error::{RbacError, Result};
use crate::identity::{self, filter_by_owner};
use crate::types::{Permission, Role};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{OwnedRwLockWriteGuard, RwLock};
use tracing::debug;

/// Rows kept in insertion order
#[derive(Debug, Clone, Default)]
struct MemoryState {
    roles: Vec<Role>,
    permissions: Vec<Permission>,
}

impl MemoryState {
    fn role_index(&self, owner: &str, name: &str) -> Option<usize> {
        self.roles
            .iter()
            .position(|r| r.owner == owner && r.name == name)
    }

    fn permission_index(&self, owner: &str, name: &str) -> Option<usize> {
        self.permissions
            .iter()
            .position(|p| p.owner == owner && p.name == name)
    }
}

fn newest_first(mut roles: Vec<Role>) -> Vec<Role> {
    roles.sort_by(|a, b| b.created_time.cmp(&a.created_time));
    roles
}

/// In-memory store implementing every storage trait
///
/// Cloning is cheap and every clone shares the same rows.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<MemoryState>>,
    writes: Arc<AtomicU64>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with rows
    pub fn with_rows(roles: Vec<Role>, permissions: Vec<Permission>) -> Self {
        Self {
            state: Arc::new(RwLock::new(MemoryState { roles, permissions })),
            writes: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Number of mutating calls served so far (committed transactions count once)
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl RoleStore for MemoryStore {
    async fn find_by_owner(&self, owner: &str) -> Result<Vec<Role>> {
        let state = self.state.read().await;
        Ok(newest_first(filter_by_owner(state.roles.clone(), owner)))
    }

    async fn find_by_owners(&self, owners: &[String]) -> Result<Vec<Role>> {
        let state = self.state.read().await;
        let roles = state
            .roles
            .iter()
            .filter(|r| owners.iter().any(|o| o == &r.owner))
            .cloned()
            .collect();
        Ok(newest_first(roles))
    }

    async fn find_all(&self) -> Result<Vec<Role>> {
        let state = self.state.read().await;
        Ok(state.roles.clone())
    }

    async fn get(&self, owner: &str, name: &str) -> Result<Option<Role>> {
        let state = self.state.read().await;
        Ok(state.role_index(owner, name).map(|i| state.roles[i].clone()))
    }

    async fn insert(&self, role: Role) -> Result<bool> {
        let mut state = self.state.write().await;
        if state.role_index(&role.owner, &role.name).is_some() {
            return Ok(false);
        }
        state.roles.push(role);
        self.record_write();
        Ok(true)
    }

    async fn update_all_fields(&self, owner: &str, name: &str, role: Role) -> Result<u64> {
        let mut state = self.state.write().await;
        let Some(index) = state.role_index(owner, name) else {
            return Ok(0);
        };

        if let Some(other) = state.role_index(&role.owner, &role.name) {
            if other != index {
                return Err(RbacError::Store(format!(
                    "role '{}' already exists",
                    role.id()
                )));
            }
        }

        debug!("Replacing role {} with {}", identity::format(owner, name), role.id());
        state.roles[index] = role;
        self.record_write();
        Ok(1)
    }

    async fn delete_by_key(&self, owner: &str, name: &str) -> Result<u64> {
        let mut state = self.state.write().await;
        let Some(index) = state.role_index(owner, name) else {
            return Ok(0);
        };
        state.roles.remove(index);
        self.record_write();
        Ok(1)
    }

    async fn find_by_user(&self, user_id: &str) -> Result<Vec<Role>> {
        let state = self.state.read().await;
        Ok(state
            .roles
            .iter()
            .filter(|r| r.users.iter().any(|u| u == user_id))
            .cloned()
            .collect())
    }

    async fn find_by_name_prefix(&self, owner: &str, prefix: &str) -> Result<Vec<Role>> {
        let state = self.state.read().await;
        Ok(state
            .roles
            .iter()
            .filter(|r| r.owner == owner && r.name.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn count_by_owner(&self, owner: &str) -> Result<u64> {
        let state = self.state.read().await;
        Ok(state.roles.iter().filter(|r| r.owner == owner).count() as u64)
    }
}

#[async_trait]
impl PermissionStore for MemoryStore {
    async fn get_permissions_by_role(&self, role_id: &str) -> Result<Vec<Permission>> {
        let state = self.state.read().await;
        Ok(state
            .permissions
            .iter()
            .filter(|p| p.references_role(role_id))
            .cloned()
            .collect())
    }

    async fn update_permission(&self, id: &str, permission: Permission) -> Result<bool> {
        let (owner, name) = identity::parse(id)?;
        let mut state = self.state.write().await;
        let Some(index) = state.permission_index(owner, name) else {
            return Ok(false);
        };
        state.permissions[index] = permission;
        self.record_write();
        Ok(true)
    }

    async fn find_all(&self) -> Result<Vec<Permission>> {
        let state = self.state.read().await;
        Ok(state.permissions.clone())
    }

    async fn get_permission(&self, id: &str) -> Result<Option<Permission>> {
        let (owner, name) = identity::parse(id)?;
        let state = self.state.read().await;
        Ok(state
            .permission_index(owner, name)
            .map(|i| state.permissions[i].clone()))
    }

    async fn insert_permission(&self, permission: Permission) -> Result<bool> {
        let mut state = self.state.write().await;
        if state
            .permission_index(&permission.owner, &permission.name)
            .is_some()
        {
            return Ok(false);
        }
        state.permissions.push(permission);
        self.record_write();
        Ok(true)
    }
}

#[async_trait]
impl CascadeStore for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn CascadeTransaction>> {
        let guard = self.state.clone().write_owned().await;
        let staged = guard.clone();
        Ok(Box::new(MemoryTransaction {
            guard,
            staged,
            writes: self.writes.clone(),
        }))
    }
}

/// Transaction holding the store's write lock until it finishes
struct MemoryTransaction {
    guard: OwnedRwLockWriteGuard<MemoryState>,
    staged: MemoryState,
    writes: Arc<AtomicU64>,
}

#[async_trait]
impl CascadeTransaction for MemoryTransaction {
    async fn find_all_roles(&mut self) -> Result<Vec<Role>> {
        Ok(self.staged.roles.clone())
    }

    async fn update_role(&mut self, role: &Role) -> Result<()> {
        if let Some(index) = self.staged.role_index(&role.owner, &role.name) {
            self.staged.roles[index] = role.clone();
        }
        Ok(())
    }

    async fn find_all_permissions(&mut self) -> Result<Vec<Permission>> {
        Ok(self.staged.permissions.clone())
    }

    async fn update_permission(&mut self, permission: &Permission) -> Result<()> {
        if let Some(index) = self
            .staged
            .permission_index(&permission.owner, &permission.name)
        {
            self.staged.permissions[index] = permission.clone();
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let MemoryTransaction {
            mut guard,
            staged,
            writes,
        } = *self;
        *guard = staged;
        writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}
