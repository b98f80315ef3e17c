//! Store-wide rename cascade
//!
//! When a role's name changes, every reference to the old name in any role's
//! `roles` list and in any permission's `roles` list is rewritten inside one
//! transaction. The reference keeps its own owner component.

use crate::error::{RbacError, Result};
use crate::identity::{self, ID_SEPARATOR};
use crate::store::{CascadeStore, CascadeTransaction};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Rows rewritten by a committed cascade
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenameReport {
    pub roles_updated: usize,
    pub permissions_updated: usize,
}

/// Rewrite every reference whose name component is `old_name`.
///
/// Returns whether anything changed. References without an owner component
/// are left as they are.
pub fn rewrite_references(references: &mut [String], old_name: &str, new_name: &str) -> bool {
    let mut changed = false;
    for reference in references.iter_mut() {
        if !reference.contains(ID_SEPARATOR) {
            warn!("Skipping malformed role reference '{}'", reference);
            continue;
        }

        let (owner, name) = identity::parse_lenient(reference);
        if name == old_name {
            *reference = identity::format(owner, new_name);
            changed = true;
        }
    }
    changed
}

fn as_cascade_error(err: RbacError) -> RbacError {
    match err {
        RbacError::Cascade(_) => err,
        other => RbacError::Cascade(other.to_string()),
    }
}

/// Runs rename cascades against a transactional store
#[derive(Clone)]
pub struct RenameCascade {
    store: Arc<dyn CascadeStore>,
}

impl RenameCascade {
    pub fn new(store: Arc<dyn CascadeStore>) -> Self {
        Self { store }
    }

    /// Rename every reference to `old_name` as `new_name`, all or nothing.
    ///
    /// Any failure is reported as [`RbacError::Cascade`] and leaves the store
    /// untouched.
    pub async fn run(&self, old_name: &str, new_name: &str) -> Result<RenameReport> {
        let mut tx = self.store.begin().await.map_err(as_cascade_error)?;

        match Self::rewrite_all(tx.as_mut(), old_name, new_name).await {
            Ok(report) => {
                tx.commit().await.map_err(as_cascade_error)?;
                info!(
                    "Renamed role references {} -> {} ({} roles, {} permissions)",
                    old_name, new_name, report.roles_updated, report.permissions_updated
                );
                Ok(report)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!("Rollback after failed cascade also failed: {}", rollback_err);
                }
                Err(as_cascade_error(err))
            }
        }
    }

    async fn rewrite_all(
        tx: &mut dyn CascadeTransaction,
        old_name: &str,
        new_name: &str,
    ) -> Result<RenameReport> {
        let mut report = RenameReport::default();

        for mut role in tx.find_all_roles().await? {
            if rewrite_references(&mut role.roles, old_name, new_name) {
                debug!("Rewriting sub-role references of {}", role.id());
                tx.update_role(&role).await?;
                report.roles_updated += 1;
            }
        }

        for mut permission in tx.find_all_permissions().await? {
            if rewrite_references(&mut permission.roles, old_name, new_name) {
                debug!("Rewriting role references of {}", permission.id());
                tx.update_permission(&permission).await?;
                report.permissions_updated += 1;
            }
        }

        Ok(report)
    }
}
