//! # CretoAI Role Hierarchy Engine
//!
//! Role records, the roles-contain-roles hierarchy and the policy tuples
//! derived from permissions, kept consistent while roles change.
//!
//! ## Features
//!
//! - **Ancestor resolution** over cyclic role graphs, scoped to one owner
//! - **Policy resync** on update: remove dependent tuples, persist, re-add
//! - **Rename cascade** that rewrites every role reference in one transaction
//! - **Resync journal** recording each backend call, with compensation when a
//!   cascade fails
//! - **Pluggable storage**: in-memory or PostgreSQL (`postgres` feature)
//!
//! ## Example
//!
//! ```rust
//! use cretoai_rbac::{CoordinatorConfig, MemoryStore, Permission, Role, RoleCoordinator};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = MemoryStore::with_rows(
//!         vec![Role::new("acme", "admin").with_user("acme/alice")],
//!         vec![Permission::new("acme", "docs")
//!             .with_role("acme/admin")
//!             .with_resource("doc")
//!             .with_action("read")],
//!     );
//!     let (coordinator, backend) = RoleCoordinator::in_memory(store, CoordinatorConfig::default());
//!
//!     let renamed = Role::new("acme", "owner").with_user("acme/alice");
//!     assert!(coordinator.update_role("acme/admin", renamed).await?);
//!     assert!(backend.has_grouping("acme/alice", "acme/owner").await);
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod coordinator;
pub mod error;
pub mod hierarchy;
pub mod identity;
pub mod metrics;
pub mod policy;
pub mod store;
pub mod telemetry;
pub mod types;

pub use config::{CoordinatorConfig, LoggingConfig, RbacConfig, StoreConfig};
pub use coordinator::{PolicyOp, PolicyOpKind, RenameReport, ResyncJournal, RoleCoordinator, RoleUpdate};
pub use error::{RbacError, Result};
pub use hierarchy::{ancestors_in, AncestorResolver};
pub use identity::{ObjectId, OwnerScoped};
pub use metrics::{CoordinatorMetrics, MetricsCollector};
pub use policy::{GroupingTuple, InMemoryPolicyBackend, PolicyBackend, PolicyTuple};
pub use store::{CascadeStore, CascadeTransaction, MemoryStore, PermissionStore, RoleStore};
pub use types::{Permission, PermissionId, PolicyEffect, Role, RoleId};

#[cfg(feature = "postgres")]
pub use store::PostgresStore;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
