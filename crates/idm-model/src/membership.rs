//! Memberships: a user holding a role within a group.

use serde::{Deserialize, Serialize};

use crate::group::Group;
use crate::role::Role;
use crate::user::User;

/// The triple (role, user, group).
///
/// A membership has no storage of its own. It exists when the user is a
/// member of the role and the role is granted within the group, and it has
/// no identity beyond the triple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    /// The role held.
    pub role: Role,
    /// The user holding the role.
    pub user: User,
    /// The group the role is held in.
    pub group: Group,
}

impl Membership {
    /// Creates a membership value.
    #[must_use]
    pub const fn new(role: Role, user: User, group: Group) -> Self {
        Self { role, user, group }
    }

    /// Checks whether both links of the triple are present on the
    /// contained entities.
    #[must_use]
    pub fn is_linked(&self) -> bool {
        self.role.has_member(&self.user.id) && self.group.has_role(&self.role.name)
    }
}
