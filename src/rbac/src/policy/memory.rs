//! In-memory policy backend

use super::{policy_tuples_for, GroupingTuple, PolicyBackend, PolicyTuple};
use crate::error::Result;
use crate::identity;
use crate::store::RoleStore;
use crate::types::Permission;
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Debug, Default)]
struct TupleSets {
    grouping: BTreeSet<GroupingTuple>,
    policies: BTreeSet<PolicyTuple>,
}

/// Policy backend keeping tuples in ordered sets
///
/// Grouping tuples are derived from the *current* role records, so removal
/// must happen before a role is rewritten and re-adding after.
pub struct InMemoryPolicyBackend {
    roles: Arc<dyn RoleStore>,
    tuples: Arc<RwLock<TupleSets>>,
}

impl InMemoryPolicyBackend {
    /// Create an empty backend reading role membership from `roles`
    pub fn new(roles: Arc<dyn RoleStore>) -> Self {
        Self {
            roles,
            tuples: Arc::new(RwLock::new(TupleSets::default())),
        }
    }

    /// Membership tuples for every role the permission applies to
    ///
    /// Roles that no longer exist contribute nothing.
    pub async fn grouping_tuples_for(&self, permission: &Permission) -> Result<Vec<GroupingTuple>> {
        let permission_id = permission.id();
        let mut tuples = Vec::new();

        for role_id in &permission.roles {
            let (owner, name) = identity::parse_lenient(role_id);
            let Some(role) = self.roles.get(owner, name).await? else {
                continue;
            };

            let domains: Vec<Option<String>> = if role.domains.is_empty() {
                vec![None]
            } else {
                role.domains.iter().cloned().map(Some).collect()
            };

            for subject in role.users.iter().chain(role.roles.iter()) {
                for domain in &domains {
                    tuples.push(GroupingTuple {
                        subject: subject.clone(),
                        role: role_id.clone(),
                        domain: domain.clone(),
                        permission_id: permission_id.clone(),
                    });
                }
            }
        }

        Ok(tuples)
    }

    /// Snapshot of all membership tuples
    pub async fn grouping_tuples(&self) -> Vec<GroupingTuple> {
        self.tuples.read().await.grouping.iter().cloned().collect()
    }

    /// Snapshot of all grant tuples
    pub async fn policy_tuples(&self) -> Vec<PolicyTuple> {
        self.tuples.read().await.policies.iter().cloned().collect()
    }

    /// Whether a membership edge exists, regardless of the permission that produced it
    pub async fn has_grouping(&self, subject: &str, role: &str) -> bool {
        self.tuples
            .read()
            .await
            .grouping
            .iter()
            .any(|t| t.subject == subject && t.role == role)
    }
}

#[async_trait]
impl PolicyBackend for InMemoryPolicyBackend {
    async fn add_grouping_policies(&self, permission: &Permission) -> Result<()> {
        let derived = self.grouping_tuples_for(permission).await?;
        debug!("Adding {} grouping tuples for {}", derived.len(), permission.id());
        let mut tuples = self.tuples.write().await;
        tuples.grouping.extend(derived);
        Ok(())
    }

    async fn remove_grouping_policies(&self, permission: &Permission) -> Result<()> {
        let derived = self.grouping_tuples_for(permission).await?;
        debug!("Removing {} grouping tuples for {}", derived.len(), permission.id());
        let mut tuples = self.tuples.write().await;
        for tuple in &derived {
            tuples.grouping.remove(tuple);
        }
        Ok(())
    }

    async fn add_policies(&self, permission: &Permission) -> Result<()> {
        let derived = policy_tuples_for(permission);
        let mut tuples = self.tuples.write().await;
        tuples.policies.extend(derived);
        Ok(())
    }

    async fn remove_policies(&self, permission: &Permission) -> Result<()> {
        let derived = policy_tuples_for(permission);
        let mut tuples = self.tuples.write().await;
        for tuple in &derived {
            tuples.policies.remove(tuple);
        }
        Ok(())
    }
}
