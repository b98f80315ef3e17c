//! Resync journal
//!
//! Every policy backend call made while re-synchronizing a role is recorded
//! before it runs and marked applied once it returns. A journal left with
//! pending entries shows exactly where a run stopped; `compensation()`
//! yields the calls that undo the removals already applied.

use crate::error::Result;
use crate::types::{Permission, PermissionId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of policy backend call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PolicyOpKind {
    RemoveGrouping,
    RemovePolicies,
    AddGrouping,
    AddPolicies,
}

impl PolicyOpKind {
    /// The call that undoes this one
    pub fn inverse(self) -> Self {
        match self {
            Self::RemoveGrouping => Self::AddGrouping,
            Self::RemovePolicies => Self::AddPolicies,
            Self::AddGrouping => Self::RemoveGrouping,
            Self::AddPolicies => Self::RemovePolicies,
        }
    }

    /// Whether the call removes tuples
    pub fn is_removal(self) -> bool {
        matches!(self, Self::RemoveGrouping | Self::RemovePolicies)
    }
}

/// One recorded backend call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyOp {
    pub kind: PolicyOpKind,
    pub permission_id: PermissionId,
    /// Permission as it was when the call was planned
    pub permission: Permission,
    pub applied: bool,
}

/// Ordered log of backend calls for one coordinator run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResyncJournal {
    id: Uuid,
    role_id: String,
    enabled: bool,
    entries: Vec<PolicyOp>,
}

impl ResyncJournal {
    /// Start a journal for a run against `role_id`
    pub fn new(role_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role_id: role_id.into(),
            enabled: true,
            entries: Vec::new(),
        }
    }

    /// A journal that records nothing
    pub fn disabled(role_id: impl Into<String>) -> Self {
        Self {
            enabled: false,
            ..Self::new(role_id)
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn role_id(&self) -> &str {
        &self.role_id
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Record a planned call; returns its index when recording is enabled
    pub fn record(&mut self, kind: PolicyOpKind, permission: &Permission) -> Option<usize> {
        if !self.enabled {
            return None;
        }
        self.entries.push(PolicyOp {
            kind,
            permission_id: permission.id(),
            permission: permission.clone(),
            applied: false,
        });
        Some(self.entries.len() - 1)
    }

    /// Mark a recorded call as done
    pub fn mark_applied(&mut self, index: Option<usize>) {
        if let Some(entry) = index.and_then(|i| self.entries.get_mut(i)) {
            entry.applied = true;
        }
    }

    pub fn entries(&self) -> &[PolicyOp] {
        &self.entries
    }

    /// Calls that returned successfully
    pub fn applied(&self) -> impl DoubleEndedIterator<Item = &PolicyOp> {
        self.entries.iter().filter(|e| e.applied)
    }

    /// Calls recorded but never completed
    pub fn pending(&self) -> impl DoubleEndedIterator<Item = &PolicyOp> {
        self.entries.iter().filter(|e| !e.applied)
    }

    /// Number of applied calls of `kind` for `permission_id`
    pub fn count(&self, kind: PolicyOpKind, permission_id: &str) -> usize {
        self.applied()
            .filter(|e| e.kind == kind && e.permission_id == permission_id)
            .count()
    }

    /// Inverse of every applied removal, most recent first
    pub fn compensation(&self) -> Vec<PolicyOp> {
        self.applied()
            .filter(|e| e.kind.is_removal())
            .rev()
            .map(|e| PolicyOp {
                kind: e.kind.inverse(),
                permission_id: e.permission_id.clone(),
                permission: e.permission.clone(),
                applied: false,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serialize for audit logs or operator inspection
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_apply() {
        let permission = Permission::new("acme", "p1");
        let mut journal = ResyncJournal::new("acme/admin");

        let first = journal.record(PolicyOpKind::RemoveGrouping, &permission);
        let second = journal.record(PolicyOpKind::RemovePolicies, &permission);
        journal.mark_applied(first);

        assert_eq!(journal.len(), 2);
        assert_eq!(journal.applied().count(), 1);
        assert_eq!(journal.pending().count(), 1);
        assert_eq!(second, Some(1));
        assert_eq!(journal.count(PolicyOpKind::RemoveGrouping, "acme/p1"), 1);

        let json = journal.to_json().unwrap();
        assert!(json.contains("\"RemoveGrouping\""));
        assert!(json.contains("acme/admin"));
    }

    #[test]
    fn test_compensation_reverses_removals() {
        let p1 = Permission::new("acme", "p1");
        let p2 = Permission::new("acme", "p2");
        let mut journal = ResyncJournal::new("acme/admin");

        for (kind, permission) in [
            (PolicyOpKind::RemoveGrouping, &p1),
            (PolicyOpKind::RemovePolicies, &p1),
            (PolicyOpKind::RemoveGrouping, &p2),
            (PolicyOpKind::AddGrouping, &p2),
        ] {
            let index = journal.record(kind, permission);
            journal.mark_applied(index);
        }
        journal.record(PolicyOpKind::RemovePolicies, &p2);

        let undo: Vec<(PolicyOpKind, String)> = journal
            .compensation()
            .into_iter()
            .map(|op| (op.kind, op.permission_id))
            .collect();

        assert_eq!(
            undo,
            vec![
                (PolicyOpKind::AddGrouping, "acme/p2".to_string()),
                (PolicyOpKind::AddPolicies, "acme/p1".to_string()),
                (PolicyOpKind::AddGrouping, "acme/p1".to_string()),
            ]
        );
    }

    #[test]
    fn test_disabled_journal_records_nothing() {
        let mut journal = ResyncJournal::disabled("acme/admin");
        let index = journal.record(PolicyOpKind::AddPolicies, &Permission::new("acme", "p1"));

        journal.mark_applied(index);
        assert!(index.is_none());
        assert!(journal.is_empty());
        assert!(!journal.is_enabled());
    }
}
