//! Role domain model.

use serde::{Deserialize, Serialize};

use crate::attribute::{AttributeHolder, Attributes};
use crate::group::{insert_unique, remove_value};
use crate::link::{IdentityKind, IdentityType, StoreLink};

/// An identity role.
///
/// Members are users, referenced by their short identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    /// Role name, unique within the store.
    pub name: String,

    /// Identifiers of the users holding this role.
    pub members: Vec<String>,

    /// Custom role attributes.
    pub attributes: Attributes,

    /// Store this role is bound to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<StoreLink>,
}

impl Role {
    /// Creates a new role without members.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: Vec::new(),
            attributes: Attributes::new(),
            link: None,
        }
    }

    /// Adds a user. Returns `false` if the user was already a member.
    pub fn add_member(&mut self, user_id: &str) -> bool {
        insert_unique(&mut self.members, user_id)
    }

    /// Removes a user. Returns `false` if the user was not a member.
    pub fn remove_member(&mut self, user_id: &str) -> bool {
        remove_value(&mut self.members, user_id)
    }

    /// Checks if a user holds this role.
    #[must_use]
    pub fn has_member(&self, user_id: &str) -> bool {
        self.members.iter().any(|m| m == user_id)
    }
}

impl AttributeHolder for Role {
    fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    fn attributes_mut(&mut self) -> &mut Attributes {
        &mut self.attributes
    }
}

impl IdentityType for Role {
    const KIND: IdentityKind = IdentityKind::Role;

    fn key(&self) -> &str {
        &self.name
    }

    fn link(&self) -> Option<&StoreLink> {
        self.link.as_ref()
    }

    fn set_link(&mut self, link: Option<StoreLink>) {
        self.link = link;
    }
}
