//! Role and permission storage
//!
//! The coordinator talks to storage only through these traits so that the
//! in-memory store, the PostgreSQL store and test fakes are interchangeable.

use crate::error::Result;
use crate::types::{Permission, Role};
use async_trait::async_trait;

pub mod memory;

#[cfg(feature = "postgres")]
pub mod postgres;

pub use memory::MemoryStore;

#[cfg(feature = "postgres")]
pub use postgres::PostgresStore;

/// Durable role records keyed by `(owner, name)`
#[async_trait]
pub trait RoleStore: Send + Sync {
    /// All roles of one owner, newest first
    async fn find_by_owner(&self, owner: &str) -> Result<Vec<Role>>;

    /// All roles of several owners, newest first
    async fn find_by_owners(&self, owners: &[String]) -> Result<Vec<Role>>;

    /// Every role in the store
    async fn find_all(&self) -> Result<Vec<Role>>;

    /// A single role
    async fn get(&self, owner: &str, name: &str) -> Result<Option<Role>>;

    /// Insert a new role; `false` if the key is taken
    async fn insert(&self, role: Role) -> Result<bool>;

    /// Replace every field of the role stored at `(owner, name)`.
    ///
    /// The key itself changes when `role` carries a different name.
    /// Returns the number of affected rows.
    async fn update_all_fields(&self, owner: &str, name: &str, role: Role) -> Result<u64>;

    /// Delete a role; returns the number of affected rows
    async fn delete_by_key(&self, owner: &str, name: &str) -> Result<u64>;

    /// Roles that list `user_id` among their direct users
    async fn find_by_user(&self, user_id: &str) -> Result<Vec<Role>>;

    /// Roles of `owner` whose name starts with `prefix`
    async fn find_by_name_prefix(&self, owner: &str, prefix: &str) -> Result<Vec<Role>>;

    /// Number of roles of `owner`
    async fn count_by_owner(&self, owner: &str) -> Result<u64>;
}

/// Durable permission records
#[async_trait]
pub trait PermissionStore: Send + Sync {
    /// Permissions whose `roles` contain `role_id`
    async fn get_permissions_by_role(&self, role_id: &str) -> Result<Vec<Permission>>;

    /// Replace the permission stored at `id`; `false` if absent
    async fn update_permission(&self, id: &str, permission: Permission) -> Result<bool>;

    /// Every permission in the store
    async fn find_all(&self) -> Result<Vec<Permission>>;

    /// A single permission
    async fn get_permission(&self, id: &str) -> Result<Option<Permission>>;

    /// Insert a new permission; `false` if the key is taken
    async fn insert_permission(&self, permission: Permission) -> Result<bool>;
}

/// Store that can rewrite roles and permissions atomically
#[async_trait]
pub trait CascadeStore: Send + Sync {
    /// Open a transaction spanning both roles and permissions
    async fn begin(&self) -> Result<Box<dyn CascadeTransaction>>;
}

/// An open transaction.
///
/// Dropping it without calling [`CascadeTransaction::commit`] discards every
/// staged write.
#[async_trait]
pub trait CascadeTransaction: Send {
    /// Every role, as seen by this transaction
    async fn find_all_roles(&mut self) -> Result<Vec<Role>>;

    /// Overwrite the role stored at `(role.owner, role.name)`
    async fn update_role(&mut self, role: &Role) -> Result<()>;

    /// Every permission, as seen by this transaction
    async fn find_all_permissions(&mut self) -> Result<Vec<Permission>>;

    /// Overwrite the permission stored at `(permission.owner, permission.name)`
    async fn update_permission(&mut self, permission: &Permission) -> Result<()>;

    /// Publish staged writes
    async fn commit(self: Box<Self>) -> Result<()>;

    /// Discard staged writes
    async fn rollback(self: Box<Self>) -> Result<()>;
}
