//! Store error types.

use idm_model::NameError;
use thiserror::Error;

/// Errors that can occur during identity store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Entity not found by name.
    #[error("Entity not found: {entity_type} with name '{name}'")]
    NotFoundByName {
        /// Type of entity (e.g., "User", "Group").
        entity_type: &'static str,
        /// Entity name.
        name: String,
    },

    /// Duplicate entity (naming collision).
    #[error("Duplicate {entity_type}: {field} '{value}' already exists")]
    Duplicate {
        /// Type of entity.
        entity_type: &'static str,
        /// Field that caused the conflict.
        field: &'static str,
        /// Conflicting value.
        value: String,
    },

    /// A name is outside the name-splitting policy.
    #[error("Invalid name: {0}")]
    InvalidName(#[from] NameError),

    /// The store is misconfigured and cannot be used.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The backing service could not be reached.
    #[error("Connection error: {0}")]
    Connection(String),

    /// The backing service rejected an operation.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Stored data could not be mapped to an entity.
    #[error("Corrupt {entity_type} entry '{id}': {reason}")]
    Corrupt {
        /// Type of entity.
        entity_type: &'static str,
        /// Store-native identity of the entry.
        id: String,
        /// What is wrong with it.
        reason: String,
    },

    /// An entity handle does not originate from this store.
    #[error("{entity_type} handle does not belong to this store: {reason}")]
    TypeMismatch {
        /// Type of entity.
        entity_type: &'static str,
        /// Why the handle was rejected.
        reason: String,
    },

    /// The operation is not supported by this store.
    #[error("Operation not supported by this store: {0}")]
    Unsupported(&'static str),

    /// A lookup by name matched more than one entry.
    #[error("Ambiguous {entity_type} name '{name}': {count} entries match")]
    Ambiguous {
        /// Type of entity.
        entity_type: &'static str,
        /// Looked-up name.
        name: String,
        /// Number of matching entries.
        count: usize,
    },

    /// Internal error.
    #[error("Internal store error: {0}")]
    Internal(String),
}

impl StoreError {
    /// Creates a not found by name error.
    #[must_use]
    pub fn not_found_by_name(entity_type: &'static str, name: impl Into<String>) -> Self {
        Self::NotFoundByName {
            entity_type,
            name: name.into(),
        }
    }

    /// Creates a duplicate error.
    #[must_use]
    pub fn duplicate(
        entity_type: &'static str,
        field: &'static str,
        value: impl Into<String>,
    ) -> Self {
        Self::Duplicate {
            entity_type,
            field,
            value: value.into(),
        }
    }

    /// Creates a type mismatch error.
    #[must_use]
    pub fn type_mismatch(entity_type: &'static str, reason: impl Into<String>) -> Self {
        Self::TypeMismatch {
            entity_type,
            reason: reason.into(),
        }
    }

    /// Creates an unsupported operation error.
    #[must_use]
    pub const fn unsupported(operation: &'static str) -> Self {
        Self::Unsupported(operation)
    }

    /// Checks if this is a not found error.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFoundByName { .. })
    }

    /// Checks if this is a duplicate error.
    #[must_use]
    pub const fn is_duplicate(&self) -> bool {
        matches!(self, Self::Duplicate { .. })
    }

    /// Checks if this is an unsupported operation error.
    #[must_use]
    pub const fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported(_))
    }

    /// Checks if this error means the store cannot be used at all.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Configuration(_) | Self::Connection(_) | Self::Protocol(_) | Self::Internal(_)
        )
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
