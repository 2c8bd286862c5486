//! User domain model.
//!
//! A user is created from a full name. The full name is the lookup key;
//! the first and last names and the short identifier are derived from it
//! by the [`name`](crate::name) policy.

use serde::{Deserialize, Serialize};

use crate::attribute::{AttributeHolder, Attributes};
use crate::link::{IdentityKind, IdentityType, StoreLink};
use crate::name::{NameError, PersonName};

/// An identity user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    // === Identity ===
    /// Short identifier derived from the name; names the user's entry.
    pub id: String,
    /// Full name. Unique within the store and used for lookups.
    pub full_name: String,

    // === Profile ===
    /// User's first name.
    pub first_name: Option<String>,
    /// User's last name.
    pub last_name: Option<String>,
    /// User's email address.
    pub email: Option<String>,

    // === Custom Attributes ===
    /// Custom user attributes.
    pub attributes: Attributes,

    /// Store this user is bound to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<StoreLink>,
}

impl User {
    /// Creates a user from a full name, deriving names and identifier.
    ///
    /// ## Errors
    ///
    /// Returns [`NameError`] if the name is outside the splitting policy.
    pub fn from_full_name(full_name: &str) -> Result<Self, NameError> {
        let name = PersonName::parse(full_name)?;
        Ok(Self {
            id: name.user_id(),
            full_name: full_name.to_string(),
            first_name: Some(name.first),
            last_name: Some(name.last),
            email: None,
            attributes: Attributes::new(),
            link: None,
        })
    }

    /// Sets the user's email.
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Sets an attribute, builder style.
    #[must_use]
    pub fn with_attribute(mut self, name: &str, values: Vec<String>) -> Self {
        self.set_attribute(name, values);
        self
    }
}

impl AttributeHolder for User {
    fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    fn attributes_mut(&mut self) -> &mut Attributes {
        &mut self.attributes
    }
}

impl IdentityType for User {
    const KIND: IdentityKind = IdentityKind::User;

    fn key(&self) -> &str {
        &self.full_name
    }

    fn link(&self) -> Option<&StoreLink> {
        self.link.as_ref()
    }

    fn set_link(&mut self, link: Option<StoreLink>) {
        self.link = link;
    }
}
