//! Ancestor resolution over the roles-contain-roles graph
//!
//! A role A is an ancestor of T when T is reachable from A by following
//! `roles` edges. The graph may contain cycles, so the depth-first search
//! keeps two pieces of state per query:
//!
//! - a memo of *definitive* answers (contains / excludes), shared across all
//!   top-level roles of the scan;
//! - the set of roles on the current DFS path, used to cut cycles.
//!
//! Hitting a role that is already on the path yields no new information. A
//! negative answer computed under such a cut depends on the unfinished role
//! and is not memoized; positive answers always are.

use crate::error::Result;
use crate::identity;
use crate::store::RoleStore;
use crate::types::Role;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

/// Definitive containment answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Containment {
    Contains,
    Excludes,
}

/// Outcome of visiting one role
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visit {
    Found,
    NotFound,
    /// Not found, but the search was cut at a role still on the path
    Inconclusive,
}

/// One role being explored on the explicit DFS stack
struct Frame<'a> {
    id: String,
    role: &'a Role,
    next: usize,
    outcome: Visit,
}

/// Per-query DFS state
struct AncestorScan<'a> {
    target: &'a str,
    lookup: HashMap<String, &'a Role>,
    memo: HashMap<String, Containment>,
    on_path: HashSet<String>,
}

impl<'a> AncestorScan<'a> {
    fn new(roles: &'a [Role], target: &'a str) -> Self {
        Self {
            target,
            lookup: roles.iter().map(|r| (r.id(), r)).collect(),
            memo: HashMap::new(),
            on_path: HashSet::new(),
        }
    }

    /// Whether `role` transitively contains the target
    fn contains(&mut self, role: &'a Role) -> bool {
        let id = role.id();
        match self.visit(&id, role) {
            Visit::Found => true,
            Visit::NotFound => false,
            Visit::Inconclusive => {
                // The only role left on the path was the root itself, so
                // every other route has been explored.
                self.memo.insert(id, Containment::Excludes);
                false
            }
        }
    }

    fn memoized(&self, id: &str) -> Option<Visit> {
        self.memo.get(id).map(|answer| match answer {
            Containment::Contains => Visit::Found,
            Containment::Excludes => Visit::NotFound,
        })
    }

    fn enter(&mut self, id: String, role: &'a Role) -> Frame<'a> {
        self.on_path.insert(id.clone());
        Frame {
            id,
            role,
            next: 0,
            outcome: Visit::NotFound,
        }
    }

    fn leave(&mut self, frame: Frame<'a>) -> Visit {
        self.on_path.remove(&frame.id);
        match frame.outcome {
            Visit::Found => {
                self.memo.insert(frame.id, Containment::Contains);
            }
            Visit::NotFound => {
                self.memo.insert(frame.id, Containment::Excludes);
            }
            Visit::Inconclusive => {}
        }
        frame.outcome
    }

    /// Depth-first search from `role` on an explicit stack, so chain depth is
    /// bounded by memory rather than the thread stack.
    fn visit(&mut self, id: &str, role: &'a Role) -> Visit {
        if let Some(known) = self.memoized(id) {
            return known;
        }
        if self.on_path.contains(id) {
            return Visit::Inconclusive;
        }

        let mut stack = vec![self.enter(id.to_string(), role)];
        let mut outcome = Visit::NotFound;
        let mut child: Option<Visit> = None;

        while let Some(frame) = stack.last_mut() {
            match child.take() {
                Some(Visit::Found) => frame.outcome = Visit::Found,
                Some(Visit::Inconclusive) => frame.outcome = Visit::Inconclusive,
                Some(Visit::NotFound) | None => {}
            }

            let current: &'a Role = frame.role;
            let step = if frame.outcome == Visit::Found {
                None
            } else {
                current.roles.get(frame.next)
            };

            let Some(sub_role) = step else {
                if let Some(done) = stack.pop() {
                    outcome = self.leave(done);
                    child = Some(outcome);
                }
                continue;
            };
            frame.next += 1;

            if sub_role == self.target {
                frame.outcome = Visit::Found;
                continue;
            }

            let Some(next) = self.lookup.get(sub_role.as_str()).copied() else {
                continue;
            };

            if let Some(known) = self.memoized(sub_role) {
                child = Some(known);
                continue;
            }

            if self.on_path.contains(sub_role.as_str()) {
                child = Some(Visit::Inconclusive);
                continue;
            }

            let entered = self.enter(sub_role.clone(), next);
            stack.push(entered);
        }

        outcome
    }
}

/// Roles from `roles` that transitively contain `target`, in input order
pub fn ancestors_in(roles: &[Role], target: &str) -> Vec<Role> {
    let mut scan = AncestorScan::new(roles, target);
    roles
        .iter()
        .filter(|role| scan.contains(*role))
        .cloned()
        .collect()
}

/// Resolves ancestor roles against a role store
///
/// Nothing is cached between calls; every query reloads the owner's roles.
#[derive(Clone)]
pub struct AncestorResolver {
    roles: Arc<dyn RoleStore>,
}

impl AncestorResolver {
    /// Create a resolver reading from `roles`
    pub fn new(roles: Arc<dyn RoleStore>) -> Self {
        Self { roles }
    }

    /// Every role of `role_id`'s owner that directly or indirectly contains it
    ///
    /// Results follow store iteration order. Roles of other owners are never
    /// considered.
    pub async fn ancestor_roles(&self, role_id: &str) -> Result<Vec<Role>> {
        let (owner, _) = identity::parse_lenient(role_id);
        let roles = self.roles.find_by_owner(owner).await?;
        let ancestors = ancestors_in(&roles, role_id);

        debug!(
            "Resolved {} ancestors of {} among {} roles",
            ancestors.len(),
            role_id,
            roles.len()
        );

        Ok(ancestors)
    }
}
