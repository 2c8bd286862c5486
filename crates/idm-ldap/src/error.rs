//! LDAP-specific error types.
//!
//! ## Security Note
//!
//! Error messages must not leak sensitive information like
//! passwords or bind credentials.

use idm_model::IdentityKind;
use idm_store::StoreError;
use thiserror::Error;

/// LDAP result code: the entry does not exist.
pub const RC_NO_SUCH_OBJECT: u32 = 32;

/// LDAP result code: the operation is not allowed on a non-leaf entry.
pub const RC_NOT_ALLOWED_ON_NON_LEAF: u32 = 66;

/// LDAP result code: the entry already exists.
pub const RC_ENTRY_ALREADY_EXISTS: u32 = 68;

/// LDAP-specific errors.
#[derive(Debug, Error)]
pub enum LdapError {
    /// Invalid configuration.
    #[error("LDAP configuration error: {0}")]
    Configuration(String),

    /// Connection failed.
    #[error("LDAP connection failed: {0}")]
    Connection(String),

    /// Bind (authentication) failed.
    #[error("LDAP bind failed: {0}")]
    Bind(String),

    /// An entry with this DN already exists.
    #[error("Entry already exists: {0}")]
    AlreadyExists(String),

    /// No entry with this DN exists.
    #[error("No such object: {0}")]
    NoSuchObject(String),

    /// Any other non-success result from the server.
    #[error("LDAP protocol error (result code {code}): {message}")]
    Protocol {
        /// LDAP result code.
        code: u32,
        /// Diagnostic message from the server.
        message: String,
    },

    /// An entry could not be mapped to an entity.
    #[error("Corrupt {kind} entry '{dn}': {reason}")]
    Corrupt {
        /// Entity kind the entry was read as.
        kind: IdentityKind,
        /// Entry DN.
        dn: String,
        /// What is wrong with it.
        reason: String,
    },

    /// A handle was used after its entry was removed.
    #[error("{kind} entry '{dn}' has been removed")]
    Removed {
        /// Entity kind.
        kind: IdentityKind,
        /// Entry DN.
        dn: String,
    },

    /// Underlying ldap3 error.
    #[error("LDAP error: {0}")]
    Ldap3(#[from] ldap3::LdapError),
}

impl LdapError {
    /// Creates a configuration error.
    #[must_use]
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Creates a connection error.
    #[must_use]
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Creates a corruption error.
    #[must_use]
    pub fn corrupt(kind: IdentityKind, dn: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Corrupt {
            kind,
            dn: dn.into(),
            reason: reason.into(),
        }
    }

    /// Maps a non-success LDAP result code for an operation on `dn`.
    #[must_use]
    pub fn from_result_code(code: u32, dn: &str, message: impl Into<String>) -> Self {
        match code {
            RC_NO_SUCH_OBJECT => Self::NoSuchObject(dn.to_string()),
            RC_ENTRY_ALREADY_EXISTS => Self::AlreadyExists(dn.to_string()),
            _ => Self::Protocol {
                code,
                message: message.into(),
            },
        }
    }

    /// Checks if this is a connection-related error.
    #[must_use]
    pub const fn is_connection_error(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Bind(_))
    }

    /// Checks if this error reports a missing entry.
    #[must_use]
    pub const fn is_no_such_object(&self) -> bool {
        matches!(self, Self::NoSuchObject(_))
    }

    /// Checks if this error reports a naming collision.
    #[must_use]
    pub const fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists(_))
    }
}

/// Result type for LDAP operations.
pub type LdapResult<T> = Result<T, LdapError>;

impl From<LdapError> for StoreError {
    fn from(err: LdapError) -> Self {
        match err {
            LdapError::Configuration(msg) => StoreError::Configuration(msg),
            LdapError::Connection(msg) | LdapError::Bind(msg) => StoreError::Connection(msg),
            LdapError::AlreadyExists(dn) => StoreError::duplicate("Entry", "dn", dn),
            LdapError::NoSuchObject(dn) => StoreError::not_found_by_name("Entry", dn),
            LdapError::Protocol { .. } => StoreError::Protocol(err.to_string()),
            LdapError::Corrupt { kind, dn, reason } => StoreError::Corrupt {
                entity_type: kind.as_str(),
                id: dn,
                reason,
            },
            LdapError::Removed { kind, dn } => StoreError::not_found_by_name(kind.as_str(), dn),
            LdapError::Ldap3(e) => StoreError::Protocol(e.to_string()),
        }
    }
}
