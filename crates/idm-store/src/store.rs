//! The uniform identity store contract.

use async_trait::async_trait;
use idm_model::{Attributes, Group, Membership, Role, User};

use crate::error::StoreResult;
use crate::query::{GroupQuery, MembershipQuery, Range, RoleQuery, UserQuery};

/// CRUD, membership, query and attribute operations over users, groups
/// and roles.
///
/// Lookups by name report absence as `Ok(None)`. Operations a backend
/// cannot perform report [`StoreError::Unsupported`](crate::StoreError::Unsupported).
///
/// Attribute operations accept any handle of the right kind. A handle that
/// did not come from this store is re-fetched by its key first; a handle
/// that came from a different store is rejected with
/// [`StoreError::TypeMismatch`](crate::StoreError::TypeMismatch).
#[async_trait]
pub trait IdentityStore: Send + Sync {
    // === Users ===

    /// Creates a user from a full name.
    ///
    /// ## Errors
    ///
    /// Returns `StoreError::InvalidName` if the name is outside the
    /// splitting policy and `StoreError::Duplicate` if the derived
    /// identifier is already taken.
    async fn create_user(&self, full_name: &str) -> StoreResult<User>;

    /// Removes a user.
    ///
    /// ## Errors
    ///
    /// Returns `StoreError::NotFoundByName` if the user doesn't exist.
    async fn remove_user(&self, user: &User) -> StoreResult<()>;

    /// Gets a user by full name.
    async fn get_user(&self, full_name: &str) -> StoreResult<Option<User>>;

    // === Groups ===

    /// Creates a group, optionally below a parent group.
    ///
    /// ## Errors
    ///
    /// Returns `StoreError::NotFoundByName` if the parent doesn't exist and
    /// `StoreError::Duplicate` if the name is taken.
    async fn create_group(&self, name: &str, parent: Option<&Group>) -> StoreResult<Group>;

    /// Removes a group.
    async fn remove_group(&self, group: &Group) -> StoreResult<()>;

    /// Gets a group by name, with its parent chain resolved.
    async fn get_group(&self, name: &str) -> StoreResult<Option<Group>>;

    // === Roles ===

    /// Creates a role.
    async fn create_role(&self, name: &str) -> StoreResult<Role>;

    /// Removes a role.
    async fn remove_role(&self, role: &Role) -> StoreResult<()>;

    /// Gets a role by name.
    async fn get_role(&self, name: &str) -> StoreResult<Option<Role>>;

    // === Memberships ===

    /// Makes the user a holder of the role within the group.
    async fn create_membership(
        &self,
        role: &Role,
        user: &User,
        group: &Group,
    ) -> StoreResult<Membership>;

    /// Undoes [`create_membership`](Self::create_membership). Missing links
    /// are ignored.
    async fn remove_membership(&self, role: &Role, user: &User, group: &Group)
        -> StoreResult<()>;

    /// Gets a membership triple.
    async fn get_membership(
        &self,
        role: &Role,
        user: &User,
        group: &Group,
    ) -> StoreResult<Option<Membership>>;

    // === Queries ===

    /// Runs a user query.
    async fn query_users(&self, query: &UserQuery, range: Range) -> StoreResult<Vec<User>>;

    /// Runs a group query.
    async fn query_groups(&self, query: &GroupQuery, range: Range) -> StoreResult<Vec<Group>>;

    /// Runs a role query.
    async fn query_roles(&self, query: &RoleQuery, range: Range) -> StoreResult<Vec<Role>>;

    /// Runs a membership query.
    async fn query_memberships(
        &self,
        query: &MembershipQuery,
        range: Range,
    ) -> StoreResult<Vec<Membership>>;

    // === User attributes ===

    /// Sets a user attribute. Empty `values` removes it. On success the
    /// handle holds the stored state.
    async fn set_user_attribute(
        &self,
        user: &mut User,
        name: &str,
        values: Vec<String>,
    ) -> StoreResult<()>;

    /// Removes a user attribute.
    async fn remove_user_attribute(&self, user: &mut User, name: &str) -> StoreResult<()>;

    /// Gets the values of a user attribute.
    async fn get_user_attribute_values(
        &self,
        user: &User,
        name: &str,
    ) -> StoreResult<Option<Vec<String>>>;

    /// Gets all user attributes.
    async fn get_user_attributes(&self, user: &User) -> StoreResult<Attributes>;

    // === Group attributes ===

    /// Sets a group attribute. Empty `values` removes it.
    async fn set_group_attribute(
        &self,
        group: &mut Group,
        name: &str,
        values: Vec<String>,
    ) -> StoreResult<()>;

    /// Removes a group attribute.
    async fn remove_group_attribute(&self, group: &mut Group, name: &str) -> StoreResult<()>;

    /// Gets the values of a group attribute.
    async fn get_group_attribute_values(
        &self,
        group: &Group,
        name: &str,
    ) -> StoreResult<Option<Vec<String>>>;

    /// Gets all group attributes.
    async fn get_group_attributes(&self, group: &Group) -> StoreResult<Attributes>;

    // === Role attributes ===

    /// Sets a role attribute. Empty `values` removes it.
    async fn set_role_attribute(
        &self,
        role: &mut Role,
        name: &str,
        values: Vec<String>,
    ) -> StoreResult<()>;

    /// Removes a role attribute.
    async fn remove_role_attribute(&self, role: &mut Role, name: &str) -> StoreResult<()>;

    /// Gets the values of a role attribute.
    async fn get_role_attribute_values(
        &self,
        role: &Role,
        name: &str,
    ) -> StoreResult<Option<Vec<String>>>;

    /// Gets all role attributes.
    async fn get_role_attributes(&self, role: &Role) -> StoreResult<Attributes>;
}
