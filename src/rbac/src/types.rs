//! Role and permission records

use crate::identity::{self, OwnerScoped};
use serde::{Deserialize, Serialize};

/// Unique role identifier (`owner/name`)
pub type RoleId = String;

/// Unique permission identifier (`owner/name`)
pub type PermissionId = String;

/// Role record
///
/// `roles` holds the sub-roles this role contains: if role A lists B, members
/// of B inherit everything granted to A. The edge set may contain cycles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    /// Owning organization
    pub owner: String,

    /// Role name, unique within the owner
    pub name: String,

    /// RFC 3339 creation timestamp
    pub created_time: String,

    /// Human readable name
    #[serde(default)]
    pub display_name: String,

    /// Users granted this role directly (`owner/name`)
    #[serde(default)]
    pub users: Vec<String>,

    /// Contained sub-roles (`owner/name`)
    #[serde(default)]
    pub roles: Vec<RoleId>,

    /// Domain tags scoping the role
    #[serde(default)]
    pub domains: Vec<String>,

    /// Whether the role is active
    #[serde(default)]
    pub is_enabled: bool,
}

impl Role {
    /// Create an enabled role with no members
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            owner: owner.into(),
            display_name: name.clone(),
            name,
            created_time: chrono::Utc::now().to_rfc3339(),
            users: Vec::new(),
            roles: Vec::new(),
            domains: Vec::new(),
            is_enabled: true,
        }
    }

    /// Add a direct user
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.users.push(user.into());
        self
    }

    /// Add a contained sub-role
    pub fn with_sub_role(mut self, role_id: impl Into<String>) -> Self {
        self.roles.push(role_id.into());
        self
    }

    /// Add a domain tag
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domains.push(domain.into());
        self
    }

    /// Override the creation timestamp
    pub fn with_created_time(mut self, created_time: impl Into<String>) -> Self {
        self.created_time = created_time.into();
        self
    }

    /// Global identifier
    pub fn id(&self) -> RoleId {
        identity::format(&self.owner, &self.name)
    }

    /// Whether `role_id` is a direct sub-role
    pub fn contains_directly(&self, role_id: &str) -> bool {
        self.roles.iter().any(|r| r == role_id)
    }
}

impl OwnerScoped for Role {
    fn owner(&self) -> &str {
        &self.owner
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Effect of a permission grant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum PolicyEffect {
    /// Grant the actions
    Allow,
    /// Refuse the actions
    Deny,
}

impl Default for PolicyEffect {
    fn default() -> Self {
        Self::Allow
    }
}

impl PolicyEffect {
    /// Stable string form used in policy tuples
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Allow => "Allow",
            Self::Deny => "Deny",
        }
    }
}

/// Permission record
///
/// The coordinator only reads the identifier and `roles`; the remaining
/// fields feed the policy backend when it derives tuples.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Permission {
    /// Owning organization
    pub owner: String,

    /// Permission name, unique within the owner
    pub name: String,

    /// RFC 3339 creation timestamp
    pub created_time: String,

    /// Users granted directly
    #[serde(default)]
    pub users: Vec<String>,

    /// Roles the permission applies to (`owner/name`)
    #[serde(default)]
    pub roles: Vec<RoleId>,

    /// Domain tags
    #[serde(default)]
    pub domains: Vec<String>,

    /// Kind of resource the grant covers (e.g. "Application")
    #[serde(default)]
    pub resource_type: String,

    /// Resources covered by the grant
    #[serde(default)]
    pub resources: Vec<String>,

    /// Actions covered by the grant
    #[serde(default)]
    pub actions: Vec<String>,

    /// Allow or deny
    #[serde(default)]
    pub effect: PolicyEffect,

    /// Whether the permission is active
    #[serde(default)]
    pub is_enabled: bool,
}

impl Permission {
    /// Create an enabled allow permission with no subjects
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
            created_time: chrono::Utc::now().to_rfc3339(),
            users: Vec::new(),
            roles: Vec::new(),
            domains: Vec::new(),
            resource_type: "Application".to_string(),
            resources: Vec::new(),
            actions: Vec::new(),
            effect: PolicyEffect::Allow,
            is_enabled: true,
        }
    }

    /// Apply the permission to a role
    pub fn with_role(mut self, role_id: impl Into<String>) -> Self {
        self.roles.push(role_id.into());
        self
    }

    /// Grant the permission to a user directly
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.users.push(user.into());
        self
    }

    /// Add a covered resource
    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resources.push(resource.into());
        self
    }

    /// Add a covered action
    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.actions.push(action.into());
        self
    }

    /// Add a domain tag
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domains.push(domain.into());
        self
    }

    /// Set the effect
    pub fn with_effect(mut self, effect: PolicyEffect) -> Self {
        self.effect = effect;
        self
    }

    /// Global identifier
    pub fn id(&self) -> PermissionId {
        identity::format(&self.owner, &self.name)
    }

    /// Whether the permission applies to `role_id`
    pub fn references_role(&self, role_id: &str) -> bool {
        self.roles.iter().any(|r| r == role_id)
    }
}

impl OwnerScoped for Permission {
    fn owner(&self) -> &str {
        &self.owner
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Clear the direct user lists so role listings don't leak membership
pub fn mask_users(mut roles: Vec<Role>) -> Vec<Role> {
    for role in &mut roles {
        role.users.clear();
    }
    roles
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_creation() {
        let role = Role::new("acme", "admin")
            .with_user("acme/alice")
            .with_sub_role("acme/editor")
            .with_domain("eu");

        assert_eq!(role.id(), "acme/admin");
        assert_eq!(role.display_name, "admin");
        assert!(role.is_enabled);
        assert!(role.contains_directly("acme/editor"));
        assert!(!role.contains_directly("acme/viewer"));
    }

    #[test]
    fn test_permission_creation() {
        let permission = Permission::new("acme", "read-docs")
            .with_role("acme/editor")
            .with_resource("docs")
            .with_action("read")
            .with_effect(PolicyEffect::Deny);

        assert_eq!(permission.id(), "acme/read-docs");
        assert!(permission.references_role("acme/editor"));
        assert_eq!(permission.effect.as_str(), "Deny");
    }

    #[test]
    fn test_role_json_uses_camel_case() {
        let role = Role::new("acme", "admin").with_created_time("2024-01-01T00:00:00Z");
        let json = serde_json::to_value(&role).unwrap();

        assert_eq!(json["createdTime"], "2024-01-01T00:00:00Z");
        assert_eq!(json["isEnabled"], true);

        let back: Role = serde_json::from_value(json).unwrap();
        assert_eq!(back, role);
    }

    #[test]
    fn test_mask_users() {
        let roles = vec![
            Role::new("acme", "a").with_user("acme/alice"),
            Role::new("acme", "b").with_user("acme/bob"),
        ];

        assert!(mask_users(roles).iter().all(|r| r.users.is_empty()));
    }
}
