//! Role hierarchy module
//!
//! Resolves which roles transitively contain a given role within one owner's
//! scope.
//!
//! # Features
//!
//! - **Cycle Tolerance**: self-references and cycles terminate
//! - **Shared Memo**: definitive answers are reused across the whole scan
//! - **Stable Order**: ancestors come back in store iteration order
//!
//! # Example
//!
//! ```rust
//! use cretoai_rbac::hierarchy::ancestors_in;
//! use cretoai_rbac::types::Role;
//!
//! let roles = vec![
//!     Role::new("acme", "admin").with_sub_role("acme/editor"),
//!     Role::new("acme", "editor").with_sub_role("acme/viewer"),
//!     Role::new("acme", "viewer"),
//! ];
//!
//! let ancestors = ancestors_in(&roles, "acme/viewer");
//! let names: Vec<&str> = ancestors.iter().map(|r| r.name.as_str()).collect();
//! assert_eq!(names, vec!["admin", "editor"]);
//! ```

pub mod ancestors;


pub use ancestors::{ancestors_in, AncestorResolver};
