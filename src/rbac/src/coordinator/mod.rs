//! Role mutation coordinator
//!
//! Keeps the policy backend in lock-step with role and permission records
//! while roles are added, updated, renamed and deleted.
//!
//! # Update protocol
//!
//! ```text
//! get role ──absent──► Ok(false)
//!    │
//!    ├─ new key held by another role ─► Ok(false)
//!    ▼
//! remove tuples (direct: grouping + policies, ancestors: grouping)
//!    │
//!    ├─ name changed ─► rename cascade ──failed──► compensate ─► Ok(false)
//!    ▼
//! persist full record under the original key
//!    │
//!    ▼
//! re-add tuples for the new identifier ─► Ok(rows affected > 0)
//! ```
//!
//! Each phase keeps its own visited set so that a permission reachable both
//! directly and through an ancestor is touched exactly once per phase.

pub mod journal;
pub mod rename;

pub use journal::{PolicyOp, PolicyOpKind, ResyncJournal};
pub use rename::{rewrite_references, RenameCascade, RenameReport};

use crate::config::CoordinatorConfig;
use crate::error::{RbacError, Result};
use crate::hierarchy::AncestorResolver;
use crate::identity;
use crate::metrics::{CoordinatorMetrics, MetricsCollector};
use crate::policy::{InMemoryPolicyBackend, PolicyBackend};
use crate::store::{CascadeStore, MemoryStore, PermissionStore, RoleStore};
use crate::types::{mask_users, Permission, Role};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Direction of a resync phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Remove,
    Add,
}

impl Phase {
    fn grouping(self) -> PolicyOpKind {
        match self {
            Self::Remove => PolicyOpKind::RemoveGrouping,
            Self::Add => PolicyOpKind::AddGrouping,
        }
    }

    fn policies(self) -> PolicyOpKind {
        match self {
            Self::Remove => PolicyOpKind::RemovePolicies,
            Self::Add => PolicyOpKind::AddPolicies,
        }
    }
}

/// Result of an update, with the journal of policy calls it made
#[derive(Debug, Clone)]
pub struct RoleUpdate {
    /// Whether the role record was rewritten
    pub updated: bool,

    /// Policy backend calls in execution order
    pub journal: ResyncJournal,
}

/// Orchestrates role mutations across the stores and the policy backend
///
/// # Thread Safety
///
/// Calls are not coordinated with each other: concurrent updates of roles
/// that reference one another can interleave.
#[derive(Clone)]
pub struct RoleCoordinator {
    roles: Arc<dyn RoleStore>,
    permissions: Arc<dyn PermissionStore>,
    policies: Arc<dyn PolicyBackend>,
    resolver: AncestorResolver,
    cascade: RenameCascade,
    config: CoordinatorConfig,
    metrics: MetricsCollector,
}

impl RoleCoordinator {
    /// Create a coordinator over explicit collaborators
    pub fn new(
        roles: Arc<dyn RoleStore>,
        permissions: Arc<dyn PermissionStore>,
        cascade_store: Arc<dyn CascadeStore>,
        policies: Arc<dyn PolicyBackend>,
        config: CoordinatorConfig,
    ) -> Self {
        info!(
            "RoleCoordinator initialized with journal={}, compensation={}",
            config.journal_enabled, config.compensate_on_cascade_failure
        );

        Self {
            resolver: AncestorResolver::new(roles.clone()),
            cascade: RenameCascade::new(cascade_store),
            roles,
            permissions,
            policies,
            config,
            metrics: MetricsCollector::new(),
        }
    }

    /// Coordinator over a [`MemoryStore`] and an [`InMemoryPolicyBackend`]
    ///
    /// Returns the backend as well so callers can inspect derived tuples.
    pub fn in_memory(
        store: MemoryStore,
        config: CoordinatorConfig,
    ) -> (Self, Arc<InMemoryPolicyBackend>) {
        let store = Arc::new(store);
        let backend = Arc::new(InMemoryPolicyBackend::new(store.clone()));
        let coordinator = Self::new(
            store.clone(),
            store.clone(),
            store,
            backend.clone(),
            config,
        );
        (coordinator, backend)
    }

    /// Snapshot of the coordinator counters
    pub async fn metrics(&self) -> CoordinatorMetrics {
        self.metrics.get_metrics().await
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    /// Look up a role by `owner/name`
    pub async fn get_role(&self, id: &str) -> Result<Option<Role>> {
        let (owner, name) = identity::parse(id)?;
        if owner.is_empty() || name.is_empty() {
            return Ok(None);
        }
        self.roles.get(owner, name).await
    }

    /// Roles of one owner, newest first
    pub async fn get_roles(&self, owner: &str) -> Result<Vec<Role>> {
        self.roles.find_by_owner(owner).await
    }

    /// Roles of several owners, newest first
    pub async fn get_roles_by_owners(&self, owners: &[String]) -> Result<Vec<Role>> {
        self.roles.find_by_owners(owners).await
    }

    /// Number of roles of `owner`
    pub async fn get_role_count(&self, owner: &str) -> Result<u64> {
        self.roles.count_by_owner(owner).await
    }

    /// Roles granted to `user_id` directly, with member lists masked
    pub async fn get_roles_by_user(&self, user_id: &str) -> Result<Vec<Role>> {
        let roles = self.roles.find_by_user(user_id).await?;
        Ok(mask_users(roles))
    }

    /// Roles of `owner` whose name starts with `prefix`
    pub async fn get_roles_by_name_prefix(&self, owner: &str, prefix: &str) -> Result<Vec<Role>> {
        self.roles.find_by_name_prefix(owner, prefix).await
    }

    /// Roles with their member lists cleared
    pub fn get_masked_roles(&self, roles: Vec<Role>) -> Vec<Role> {
        mask_users(roles)
    }

    /// Every role of the same owner that transitively contains `role_id`
    pub async fn ancestor_roles(&self, role_id: &str) -> Result<Vec<Role>> {
        self.resolver.ancestor_roles(role_id).await
    }

    // ------------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------------

    /// Insert a new role; `false` if the key is taken
    pub async fn add_role(&self, role: Role) -> Result<bool> {
        if role.owner.is_empty() || role.name.is_empty() {
            return Err(RbacError::InvalidInput(
                "role owner and name must not be empty".to_string(),
            ));
        }

        let id = role.id();
        let inserted = self.roles.insert(role).await?;
        debug!("Add role {}: inserted={}", id, inserted);
        Ok(inserted)
    }

    /// Replace the role at `role_id` and resync its policy tuples.
    ///
    /// Returns `Ok(false)` when the role does not exist, when the new key is
    /// already held by another role, or when the rename cascade fails. Store and backend failures are returned as errors.
    pub async fn update_role(&self, role_id: &str, role: Role) -> Result<bool> {
        Ok(self.update_role_with_journal(role_id, role).await?.updated)
    }

    /// Like [`RoleCoordinator::update_role`], also returning the journal
    pub async fn update_role_with_journal(&self, role_id: &str, role: Role) -> Result<RoleUpdate> {
        let result = self.run_update(role_id, role).await;
        if let Err(err) = &result {
            self.report_error("update", role_id, err).await;
        }
        result
    }

    /// Delete a role, scrubbing it from every permission first.
    ///
    /// Each permission is written on its own; a failure part way leaves the
    /// earlier permissions scrubbed. Other roles that list the deleted role
    /// as a sub-role are not touched.
    pub async fn delete_role(&self, role: &Role) -> Result<bool> {
        let result = self.run_delete(role).await;
        if let Err(err) = &result {
            self.report_error("delete", &role.id(), err).await;
        }
        result
    }

    async fn run_update(&self, role_id: &str, role: Role) -> Result<RoleUpdate> {
        let (owner, name) = identity::parse(role_id)?;
        let mut journal = self.new_journal(role_id);

        if self.roles.get(owner, name).await?.is_none() {
            info!("Update skipped, role {} does not exist", role_id);
            self.metrics.record_update(false).await;
            return Ok(RoleUpdate {
                updated: false,
                journal,
            });
        }
        let target_moves = role.owner != owner || role.name != name;
        if target_moves && self.roles.get(&role.owner, &role.name).await?.is_some() {
            warn!(
                "Update of {} rejected, target {} already exists",
                role_id,
                role.id()
            );
            return Ok(RoleUpdate {
                updated: false,
                journal,
            });
        }
        self.metrics.record_update(true).await;

        self.resync(&mut journal, role_id, Phase::Remove).await?;

        if name != role.name {
            match self.cascade.run(name, &role.name).await {
                Ok(_) => self.metrics.record_cascade(true).await,
                Err(err) => {
                    warn!("Rename {} -> {} aborted: {}", role_id, role.name, err);
                    self.metrics.record_cascade(false).await;
                    if self.config.compensate_on_cascade_failure {
                        self.compensate(&mut journal).await?;
                    }
                    if let Ok(json) = journal.to_json() {
                        debug!("Journal {} after aborted rename: {}", journal.id(), json);
                    }
                    return Ok(RoleUpdate {
                        updated: false,
                        journal,
                    });
                }
            }
        }

        let new_role_id = role.id();
        let affected = self.roles.update_all_fields(owner, name, role).await?;

        self.resync(&mut journal, &new_role_id, Phase::Add).await?;

        info!(
            "Updated role {} -> {} ({} policy calls)",
            role_id,
            new_role_id,
            journal.len()
        );

        Ok(RoleUpdate {
            updated: affected != 0,
            journal,
        })
    }

    async fn run_delete(&self, role: &Role) -> Result<bool> {
        let role_id = role.id();
        self.metrics.record_delete().await;

        let permissions = self.permissions.get_permissions_by_role(&role_id).await?;
        for permission in permissions {
            let mut journal = self.new_journal(&role_id);
            let mut scrubbed = permission.clone();
            scrubbed.roles.retain(|r| r != &role_id);

            self.apply(&mut journal, PolicyOpKind::RemoveGrouping, &permission).await?;
            self.apply(&mut journal, PolicyOpKind::RemovePolicies, &permission).await?;

            let permission_id = scrubbed.id();
            if !self
                .permissions
                .update_permission(&permission_id, scrubbed.clone())
                .await?
            {
                warn!("Permission {} vanished while scrubbing {}", permission_id, role_id);
                continue;
            }

            self.apply(&mut journal, PolicyOpKind::AddGrouping, &scrubbed).await?;
            self.apply(&mut journal, PolicyOpKind::AddPolicies, &scrubbed).await?;
            debug!("Scrubbed {} from permission {}", role_id, permission_id);
        }

        let affected = self.roles.delete_by_key(&role.owner, &role.name).await?;
        info!("Deleted role {} (affected={})", role_id, affected);
        Ok(affected != 0)
    }

    /// Remove or re-add every tuple that depends on `role_id`
    async fn resync(&self, journal: &mut ResyncJournal, role_id: &str, phase: Phase) -> Result<()> {
        let mut visited: HashSet<String> = HashSet::new();

        for permission in self.permissions.get_permissions_by_role(role_id).await? {
            self.apply(journal, phase.grouping(), &permission).await?;
            self.apply(journal, phase.policies(), &permission).await?;
            visited.insert(permission.id());
        }

        // Ancestors confer membership, not direct grants.
        for ancestor in self.resolver.ancestor_roles(role_id).await? {
            for permission in self
                .permissions
                .get_permissions_by_role(&ancestor.id())
                .await?
            {
                if visited.insert(permission.id()) {
                    self.apply(journal, phase.grouping(), &permission).await?;
                }
            }
        }

        debug!(
            "{:?} phase for {} touched {} permissions",
            phase,
            role_id,
            visited.len()
        );
        Ok(())
    }

    /// Record, execute and mark one backend call
    async fn apply(
        &self,
        journal: &mut ResyncJournal,
        kind: PolicyOpKind,
        permission: &Permission,
    ) -> Result<()> {
        let index = journal.record(kind, permission);

        match kind {
            PolicyOpKind::RemoveGrouping => self.policies.remove_grouping_policies(permission).await?,
            PolicyOpKind::RemovePolicies => self.policies.remove_policies(permission).await?,
            PolicyOpKind::AddGrouping => self.policies.add_grouping_policies(permission).await?,
            PolicyOpKind::AddPolicies => self.policies.add_policies(permission).await?,
        }

        journal.mark_applied(index);
        self.metrics.record_policy_call(kind.is_removal()).await;
        Ok(())
    }

    /// Undo every removal applied so far
    async fn compensate(&self, journal: &mut ResyncJournal) -> Result<()> {
        let undo = journal.compensation();
        if undo.is_empty() && !journal.is_enabled() {
            warn!("Cannot restore tuples for {}: journal disabled", journal.role_id());
            return Ok(());
        }

        for op in undo {
            self.apply(journal, op.kind, &op.permission).await?;
            self.metrics.record_compensation().await;
        }
        info!("Restored removed tuples for {}", journal.role_id());
        Ok(())
    }

    fn new_journal(&self, role_id: &str) -> ResyncJournal {
        if self.config.journal_enabled {
            ResyncJournal::new(role_id)
        } else {
            ResyncJournal::disabled(role_id)
        }
    }

    async fn report_error(&self, operation: &str, role_id: &str, err: &RbacError) {
        if err.is_systemic() {
            error!("Role {} of {} failed: {}", operation, role_id, err);
            self.metrics.record_error().await;
        } else {
            warn!("Role {} of {} rejected: {}", operation, role_id, err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coordinator(roles: Vec<Role>, permissions: Vec<Permission>) -> (RoleCoordinator, MemoryStore) {
        let store = MemoryStore::with_rows(roles, permissions);
        let (coordinator, _) = RoleCoordinator::in_memory(store.clone(), CoordinatorConfig::default());
        (coordinator, store)
    }

    #[tokio::test]
    async fn test_get_role_rejects_empty_components() {
        let (coordinator, _) = coordinator(vec![Role::new("acme", "admin")], vec![]);

        assert!(coordinator.get_role("acme/admin").await.unwrap().is_some());
        assert!(coordinator.get_role("acme/").await.unwrap().is_none());
        assert!(coordinator.get_role("/admin").await.unwrap().is_none());
        assert!(coordinator.get_role("acme").await.is_err());
    }

    #[tokio::test]
    async fn test_roles_by_user_are_masked() {
        let (coordinator, _) = coordinator(
            vec![
                Role::new("acme", "admin").with_user("acme/alice"),
                Role::new("acme", "viewer").with_user("acme/bob"),
            ],
            vec![],
        );

        let roles = coordinator.get_roles_by_user("acme/alice").await.unwrap();
        assert_eq!(roles.len(), 1);
        assert_eq!(roles[0].name, "admin");
        assert!(roles[0].users.is_empty());
    }

    #[tokio::test]
    async fn test_prefix_and_count_queries() {
        let (coordinator, _) = coordinator(
            vec![
                Role::new("acme", "team-a"),
                Role::new("acme", "team-b"),
                Role::new("acme", "admin"),
                Role::new("globex", "team-c"),
            ],
            vec![],
        );

        assert_eq!(coordinator.get_role_count("acme").await.unwrap(), 3);
        assert_eq!(
            coordinator
                .get_roles_by_name_prefix("acme", "team-")
                .await
                .unwrap()
                .len(),
            2
        );
        assert_eq!(
            coordinator
                .get_roles_by_owners(&["acme".to_string(), "globex".to_string()])
                .await
                .unwrap()
                .len(),
            4
        );
    }

    #[tokio::test]
    async fn test_add_role_rejects_duplicates() {
        let (coordinator, _) = coordinator(vec![], vec![]);

        assert!(coordinator.add_role(Role::new("acme", "admin")).await.unwrap());
        assert!(!coordinator.add_role(Role::new("acme", "admin")).await.unwrap());
        assert!(matches!(
            coordinator.add_role(Role::new("acme", "")).await,
            Err(RbacError::InvalidInput(_))
        ));
        assert_eq!(coordinator.get_roles("acme").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_without_rename_records_both_phases() {
        let (coordinator, _) = coordinator(
            vec![Role::new("acme", "admin").with_user("acme/alice")],
            vec![Permission::new("acme", "p1").with_role("acme/admin")],
        );

        let role = Role::new("acme", "admin").with_user("acme/bob");
        let outcome = coordinator
            .update_role_with_journal("acme/admin", role)
            .await
            .unwrap();

        assert!(outcome.updated);
        let kinds: Vec<PolicyOpKind> = outcome.journal.entries().iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![
                PolicyOpKind::RemoveGrouping,
                PolicyOpKind::RemovePolicies,
                PolicyOpKind::AddGrouping,
                PolicyOpKind::AddPolicies,
            ]
        );
        assert_eq!(outcome.journal.pending().count(), 0);

        let metrics = coordinator.metrics().await;
        assert_eq!(metrics.role_updates, 1);
        assert_eq!(metrics.tuple_removes, 2);
        assert_eq!(metrics.tuple_adds, 2);
    }

    #[tokio::test]
    async fn test_malformed_identifier_is_an_error() {
        let (coordinator, store) = coordinator(vec![], vec![]);

        let result = coordinator.update_role("acme", Role::new("acme", "x")).await;
        assert!(matches!(result, Err(RbacError::InvalidIdentifier(_))));
        assert_eq!(store.write_count(), 0);
    }
}
