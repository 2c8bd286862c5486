//! Links between in-memory entities and the store that produced them.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifies the store an entity was read from or written to, and the
/// entity's identity inside that store.
///
/// Entities built by callers carry no link; stores attach one when they
/// bind or materialize an entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StoreLink {
    /// Identifier of the owning store instance.
    pub store_id: Uuid,
    /// Store-native identity (for a directory, the entry DN).
    pub external_id: String,
}

impl StoreLink {
    /// Creates a new link.
    #[must_use]
    pub fn new(store_id: Uuid, external_id: impl Into<String>) -> Self {
        Self {
            store_id,
            external_id: external_id.into(),
        }
    }

    /// Checks whether the link points at the given store.
    #[must_use]
    pub fn belongs_to(&self, store_id: Uuid) -> bool {
        self.store_id == store_id
    }
}

/// Kind of identity entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentityKind {
    /// A user.
    User,
    /// A group.
    Group,
    /// A role.
    Role,
}

impl IdentityKind {
    /// Returns the display name of the kind.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::User => "User",
            Self::Group => "Group",
            Self::Role => "Role",
        }
    }
}

impl std::fmt::Display for IdentityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Common behaviour of users, groups and roles.
pub trait IdentityType {
    /// The entity kind.
    const KIND: IdentityKind;

    /// The key that uniquely names the entity within its kind.
    fn key(&self) -> &str;

    /// The store link, if the entity came from a store.
    fn link(&self) -> Option<&StoreLink>;

    /// Replaces the store link.
    fn set_link(&mut self, link: Option<StoreLink>);
}
