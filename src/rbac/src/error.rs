//! Error types for the role propagation engine

use thiserror::Error;

/// Role engine errors
///
/// A missing role or permission is never an error here: lookups return
/// `Ok(None)` and mutations return `Ok(false)`.
#[derive(Debug, Error)]
pub enum RbacError {
    /// Malformed `owner/name` identifier
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Role or permission store failure
    #[error("Store error: {0}")]
    Store(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// Policy backend failure
    #[error("Policy backend error: {0}")]
    Policy(String),

    /// Rename cascade could not be committed
    #[error("Rename cascade failed: {0}")]
    Cascade(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RbacError {
    /// Whether the error points at a systemic fault worth alerting on.
    ///
    /// Cascade failures and bad input are expected conditions that a caller
    /// can retry with corrected input.
    pub fn is_systemic(&self) -> bool {
        matches!(
            self,
            Self::Store(_) | Self::Database(_) | Self::Policy(_) | Self::Io(_)
        )
    }
}

#[cfg(feature = "postgres")]
impl From<sqlx::Error> for RbacError {
    fn from(err: sqlx::Error) -> Self {
        RbacError::Database(err.to_string())
    }
}

/// Result type for role engine operations
pub type Result<T> = std::result::Result<T, RbacError>;
