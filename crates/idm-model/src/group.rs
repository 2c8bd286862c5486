//! Group domain model.
//!
//! Groups can be hierarchical. A group lists its child groups and the
//! roles granted within it; its parent is resolved by the store when the
//! group is read and is never stored on the child itself.

use serde::{Deserialize, Serialize};

use crate::attribute::{AttributeHolder, Attributes};
use crate::link::{IdentityKind, IdentityType, StoreLink};

/// An identity group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    // === Identity ===
    /// Group name, unique within the store.
    pub name: String,

    // === Hierarchy ===
    /// Parent group, when resolved (None for top-level groups).
    pub parent: Option<Box<Group>>,
    /// Names of child groups.
    pub children: Vec<String>,

    // === Role Mappings ===
    /// Names of roles held within this group.
    pub roles: Vec<String>,

    // === Custom Attributes ===
    /// Custom group attributes.
    pub attributes: Attributes,

    /// Store this group is bound to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<StoreLink>,
}

impl Group {
    /// Creates a new top-level group.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            children: Vec::new(),
            roles: Vec::new(),
            attributes: Attributes::new(),
            link: None,
        }
    }

    /// Sets the parent group.
    #[must_use]
    pub fn with_parent(mut self, parent: Group) -> Self {
        self.parent = Some(Box::new(parent));
        self
    }

    /// Checks if this is a top-level group.
    #[must_use]
    pub const fn is_top_level(&self) -> bool {
        self.parent.is_none()
    }

    /// Name of the parent group, if any.
    #[must_use]
    pub fn parent_name(&self) -> Option<&str> {
        self.parent.as_deref().map(|p| p.name.as_str())
    }

    /// Gets the path from the root to this group (e.g. `/acme/engineering`).
    #[must_use]
    pub fn path(&self) -> String {
        let mut segments = vec![self.name.as_str()];
        let mut current = self.parent.as_deref();
        while let Some(group) = current {
            segments.push(group.name.as_str());
            current = group.parent.as_deref();
        }
        segments.reverse();
        format!("/{}", segments.join("/"))
    }

    /// Adds a child group. Returns `false` if it was already a child.
    pub fn add_child(&mut self, name: &str) -> bool {
        insert_unique(&mut self.children, name)
    }

    /// Removes a child group. Returns `false` if it was not a child.
    pub fn remove_child(&mut self, name: &str) -> bool {
        remove_value(&mut self.children, name)
    }

    /// Checks if a group is a child of this group.
    #[must_use]
    pub fn has_child(&self, name: &str) -> bool {
        self.children.iter().any(|c| c == name)
    }

    /// Grants a role within this group. Returns `false` if already granted.
    pub fn add_role(&mut self, name: &str) -> bool {
        insert_unique(&mut self.roles, name)
    }

    /// Revokes a role from this group. Returns `false` if it was not granted.
    pub fn remove_role(&mut self, name: &str) -> bool {
        remove_value(&mut self.roles, name)
    }

    /// Checks if this group holds a specific role.
    #[must_use]
    pub fn has_role(&self, name: &str) -> bool {
        self.roles.iter().any(|r| r == name)
    }
}

impl AttributeHolder for Group {
    fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    fn attributes_mut(&mut self) -> &mut Attributes {
        &mut self.attributes
    }
}

impl IdentityType for Group {
    const KIND: IdentityKind = IdentityKind::Group;

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

pub(crate) fn insert_unique(values: &mut Vec<String>, value: &str) -> bool {
    if values.iter().any(|v| v == value) {
        return false;
    }
    values.push(value.to_string());
    true
}

pub(crate) fn remove_value(values: &mut Vec<String>, value: &str) -> bool {
    let before = values.len();
    values.retain(|v| v != value);
    values.len() != before
}
