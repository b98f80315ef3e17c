//! Policy backend interface and derived tuple types
//!
//! The backend owns two kinds of facts derived from role and permission
//! records:
//!
//! - **Grouping tuples**: membership edges (`user → role`, `sub_role → role`)
//!   for the roles a permission applies to.
//! - **Policy tuples**: direct grants (`subject, resource, action, effect`).
//!
//! Both are keyed by the permission that produced them. Add and remove are
//! set operations, so calling them twice is harmless.

use crate::error::Result;
use crate::types::{Permission, PermissionId, PolicyEffect};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod memory;

pub use memory::InMemoryPolicyBackend;

/// Role membership fact
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupingTuple {
    /// User or sub-role inheriting `role`
    pub subject: String,

    /// Role the subject is a member of
    pub role: String,

    /// Domain the membership is scoped to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,

    /// Permission this tuple was derived for
    pub permission_id: PermissionId,
}

/// Direct grant fact
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PolicyTuple {
    /// User or role receiving the grant
    pub subject: String,

    /// Domain the grant is scoped to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,

    /// Resource covered
    pub resource: String,

    /// Action covered
    pub action: String,

    /// Allow or deny
    pub effect: PolicyEffect,

    /// Permission this tuple was derived for
    pub permission_id: PermissionId,
}

/// Backend holding derived authorization tuples
#[async_trait]
pub trait PolicyBackend: Send + Sync {
    /// Add the membership tuples derived from `permission`
    async fn add_grouping_policies(&self, permission: &Permission) -> Result<()>;

    /// Remove the membership tuples derived from `permission`
    async fn remove_grouping_policies(&self, permission: &Permission) -> Result<()>;

    /// Add the grant tuples derived from `permission`
    async fn add_policies(&self, permission: &Permission) -> Result<()>;

    /// Remove the grant tuples derived from `permission`
    async fn remove_policies(&self, permission: &Permission) -> Result<()>;
}

/// Grant tuples for every subject/domain/resource/action combination
pub fn policy_tuples_for(permission: &Permission) -> Vec<PolicyTuple> {
    let permission_id = permission.id();
    let domains: Vec<Option<String>> = if permission.domains.is_empty() {
        vec![None]
    } else {
        permission.domains.iter().cloned().map(Some).collect()
    };

    let mut tuples = Vec::new();
    for subject in permission.users.iter().chain(permission.roles.iter()) {
        for domain in &domains {
            for resource in &permission.resources {
                for action in &permission.actions {
                    tuples.push(PolicyTuple {
                        subject: subject.clone(),
                        domain: domain.clone(),
                        resource: resource.clone(),
                        action: action.clone(),
                        effect: permission.effect,
                        permission_id: permission_id.clone(),
                    });
                }
            }
        }
    }
    tuples
}
