//! Query descriptors and result ranges.
//!
//! These describe what a caller is looking for. Stores decide which
//! descriptors they can evaluate; one that cannot reports
//! [`StoreError::Unsupported`](crate::StoreError::Unsupported) instead of
//! an empty result.

/// Search criteria for users.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct UserQuery {
    /// Filter by full name (exact match).
    pub full_name: Option<String>,
    /// Filter by first name (exact match).
    pub first_name: Option<String>,
    /// Filter by last name (exact match).
    pub last_name: Option<String>,
    /// Filter by email (exact match).
    pub email: Option<String>,
    /// Filter by attribute (name, value).
    pub attribute: Option<(String, String)>,
}

impl UserQuery {
    /// Creates an empty query matching every user.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            full_name: None,
            first_name: None,
            last_name: None,
            email: None,
            attribute: None,
        }
    }

    /// Filters by full name.
    #[must_use]
    pub fn full_name(mut self, full_name: impl Into<String>) -> Self {
        self.full_name = Some(full_name.into());
        self
    }

    /// Filters by email.
    #[must_use]
    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Filters by attribute value.
    #[must_use]
    pub fn attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attribute = Some((name.into(), value.into()));
        self
    }
}

/// Search criteria for groups.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct GroupQuery {
    /// Filter by name (exact match).
    pub name: Option<String>,
    /// Filter by parent group name.
    pub parent: Option<String>,
    /// Filter by a role held in the group.
    pub role: Option<String>,
}

impl GroupQuery {
    /// Creates an empty query matching every group.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            name: None,
            parent: None,
            role: None,
        }
    }

    /// Filters by name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Filters by parent group.
    #[must_use]
    pub fn parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }
}

/// Search criteria for roles.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RoleQuery {
    /// Filter by name (exact match).
    pub name: Option<String>,
    /// Filter by member user identifier.
    pub member: Option<String>,
}

impl RoleQuery {
    /// Creates an empty query matching every role.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            name: None,
            member: None,
        }
    }

    /// Filters by name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Filters by member.
    #[must_use]
    pub fn member(mut self, user_id: impl Into<String>) -> Self {
        self.member = Some(user_id.into());
        self
    }
}

/// Search criteria for memberships. Unset parts match anything.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MembershipQuery {
    /// Role name.
    pub role: Option<String>,
    /// User full name.
    pub user: Option<String>,
    /// Group name.
    pub group: Option<String>,
}

impl MembershipQuery {
    /// Creates an empty query matching every membership.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            role: None,
            user: None,
            group: None,
        }
    }
}

/// A window over a result sequence: skip `offset`, then keep at most
/// `limit` items.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Range {
    /// Number of leading results to skip.
    pub offset: usize,
    /// Maximum results to return (None for all).
    pub limit: Option<usize>,
}

impl Range {
    /// A range covering every result.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            offset: 0,
            limit: None,
        }
    }

    /// A page of at most `limit` results starting at `offset`.
    #[must_use]
    pub const fn page(offset: usize, limit: usize) -> Self {
        Self {
            offset,
            limit: Some(limit),
        }
    }

    /// Applies the range to a result sequence.
    #[must_use]
    pub fn apply<T>(&self, results: Vec<T>) -> Vec<T> {
        let iter = results.into_iter().skip(self.offset);
        match self.limit {
            Some(limit) => iter.take(limit).collect(),
            None => iter.collect(),
        }
    }
}
