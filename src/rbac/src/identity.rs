//! Composite `owner/name` identifiers
//!
//! Every role and permission is addressed globally as `owner/name`. The
//! owner component scopes ancestor resolution; the name component is what a
//! rename rewrites.

use crate::error::{RbacError, Result};
use std::fmt;
use std::str::FromStr;

/// Separator between the owner and name components
pub const ID_SEPARATOR: char = '/';

/// Parsed `owner/name` identifier
///
/// # Examples
///
/// ```
/// use cretoai_rbac::identity::ObjectId;
/// use std::str::FromStr;
///
/// let id = ObjectId::from_str("acme/admin").unwrap();
/// assert_eq!(id.owner(), "acme");
/// assert_eq!(id.name(), "admin");
/// assert_eq!(id.to_string(), "acme/admin");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId {
    owner: String,
    name: String,
}

impl ObjectId {
    /// Build an identifier from its components
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }

    /// Owner component
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Name component
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Same owner, different name
    pub fn with_name(&self, name: impl Into<String>) -> Self {
        Self::new(self.owner.clone(), name)
    }
}

impl FromStr for ObjectId {
    type Err = RbacError;

    fn from_str(s: &str) -> Result<Self> {
        let (owner, name) = parse(s)?;
        Ok(Self::new(owner, name))
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.owner, ID_SEPARATOR, self.name)
    }
}

/// Split an identifier into `(owner, name)`.
///
/// The identifier must contain exactly one separator.
pub fn parse(id: &str) -> Result<(&str, &str)> {
    let mut parts = id.split(ID_SEPARATOR);
    match (parts.next(), parts.next(), parts.next()) {
        (Some(owner), Some(name), None) => Ok((owner, name)),
        _ => Err(RbacError::InvalidIdentifier(format!(
            "'{}' is not of the form owner/name",
            id
        ))),
    }
}

/// Split on the first separator without validating the rest.
///
/// An identifier without a separator yields an empty name.
pub fn parse_lenient(id: &str) -> (&str, &str) {
    id.split_once(ID_SEPARATOR).unwrap_or((id, ""))
}

/// Join an owner and a name into an identifier
pub fn format(owner: &str, name: &str) -> String {
    format!("{}{}{}", owner, ID_SEPARATOR, name)
}

/// Entities that live inside an owner scope
pub trait OwnerScoped {
    /// Owner component of the entity key
    fn owner(&self) -> &str;

    /// Name component of the entity key
    fn name(&self) -> &str;

    /// Global `owner/name` identifier
    fn id(&self) -> String {
        format(self.owner(), self.name())
    }
}

/// Keep only the entities that belong to `owner`
pub fn filter_by_owner<T: OwnerScoped>(items: Vec<T>, owner: &str) -> Vec<T> {
    items.into_iter().filter(|item| item.owner() == owner).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named(&'static str, &'static str);

    impl OwnerScoped for Named {
        fn owner(&self) -> &str {
            self.0
        }

        fn name(&self) -> &str {
            self.1
        }
    }

    #[test]
    fn test_parse_valid() {
        assert_eq!(parse("acme/admin").unwrap(), ("acme", "admin"));
        assert_eq!(parse("acme/").unwrap(), ("acme", ""));
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(parse("acme").is_err());
        assert!(parse("acme/team/admin").is_err());
    }

    #[test]
    fn test_parse_lenient() {
        assert_eq!(parse_lenient("acme/team/admin"), ("acme", "team/admin"));
        assert_eq!(parse_lenient("acme"), ("acme", ""));
    }

    #[test]
    fn test_format_and_object_id() {
        assert_eq!(format("acme", "admin"), "acme/admin");

        let id: ObjectId = "acme/admin".parse().unwrap();
        assert_eq!(id.with_name("owner").to_string(), "acme/owner");
        assert!("broken".parse::<ObjectId>().is_err());
    }

    #[test]
    fn test_filter_by_owner() {
        let items = vec![Named("acme", "a"), Named("globex", "b"), Named("acme", "c")];
        let kept = filter_by_owner(items, "acme");

        assert_eq!(kept.len(), 2);
        assert_eq!(kept[1].id(), "acme/c");
    }
}
