//! Directory-backed identity store.
//!
//! [`LdapIdentityStore`] composes the session, mapper, resolver and change
//! notification channel into the uniform [`IdentityStore`] contract.
//!
//! ## Entity lifecycle
//!
//! ```text
//! Unbound --create/bind--> Bound --remove/unbind--> Removed
//! ```
//!
//! `get_*` materializes Bound entities straight from a search. Handles are
//! plain values; callers that want to batch several mutations into one
//! write-back use [`BoundEntity`] through [`LdapIdentityStore::bound_role`]
//! and friends, then [`LdapIdentityStore::commit`].

use async_trait::async_trait;
use idm_model::{
    Attributes, Group, IdentityKind, IdentityType, Membership, Role, StoreLink, User,
};
use idm_store::{
    GroupQuery, IdentityStore, MembershipQuery, Range, RoleQuery, StoreError, StoreResult,
    UserQuery,
};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::config::LdapConfig;
use crate::entry::DirectoryEntry;
use crate::error::LdapResult;
use crate::mapper::DirectoryMapper;
use crate::notify::{
    BoundEntity, ChangeHandler, ChangeNotification, DirectoryBacked, EntityRef, EntityState,
};
use crate::resolver::RelationshipResolver;
use crate::session::{DirectorySession, LdapSession};

/// Entities the store can read back from an entry.
trait Materialize: DirectoryBacked + Clone {
    fn from_entry(mapper: &DirectoryMapper, entry: &DirectoryEntry) -> LdapResult<Self>;
}

impl Materialize for User {
    fn from_entry(mapper: &DirectoryMapper, entry: &DirectoryEntry) -> LdapResult<Self> {
        mapper.user_from_entry(entry)
    }
}

impl Materialize for Group {
    fn from_entry(mapper: &DirectoryMapper, entry: &DirectoryEntry) -> LdapResult<Self> {
        mapper.group_from_entry(entry)
    }
}

impl Materialize for Role {
    fn from_entry(mapper: &DirectoryMapper, entry: &DirectoryEntry) -> LdapResult<Self> {
        mapper.role_from_entry(entry)
    }
}

/// Identity store over a directory session.
///
/// One session is shared by every operation. The store does no locking;
/// concurrent writers must be serialized by the caller.
pub struct LdapIdentityStore<S = LdapSession> {
    /// Store instance id, stamped on every entity link.
    id: Uuid,
    config: LdapConfig,
    session: S,
    mapper: DirectoryMapper,
}

impl LdapIdentityStore<LdapSession> {
    /// Connects to the configured directory.
    ///
    /// ## Errors
    ///
    /// Returns `LdapError::Configuration` for an invalid configuration and
    /// `LdapError::Connection`/`LdapError::Bind` if the server cannot be
    /// reached or rejects the credentials.
    pub async fn connect(config: LdapConfig) -> LdapResult<Self> {
        let session = LdapSession::connect(&config).await?;
        Self::with_session(config, session)
    }

    /// Unbinds the underlying connection.
    pub async fn close(&self) -> LdapResult<()> {
        self.session.close().await
    }
}

impl<S: DirectorySession> LdapIdentityStore<S> {
    /// Creates a store over an existing session.
    ///
    /// ## Errors
    ///
    /// Returns `LdapError::Configuration` if the configuration is invalid.
    pub fn with_session(config: LdapConfig, session: S) -> LdapResult<Self> {
        config.validate()?;

        let id = Uuid::now_v7();
        let mapper = DirectoryMapper::new(id, &config);
        info!(
            store_id = %id,
            users_dn = %config.users_dn,
            groups_dn = %config.groups_dn,
            roles_dn = %config.roles_dn,
            "Directory identity store ready"
        );

        Ok(Self {
            id,
            config,
            session,
            mapper,
        })
    }

    /// The store instance id.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// The store configuration.
    #[must_use]
    pub const fn config(&self) -> &LdapConfig {
        &self.config
    }

    /// The directory session.
    #[must_use]
    pub const fn session(&self) -> &S {
        &self.session
    }

    /// The entity mapper.
    #[must_use]
    pub const fn mapper(&self) -> &DirectoryMapper {
        &self.mapper
    }

    /// A relationship resolver over this store's session.
    #[must_use]
    pub fn resolver(&self) -> RelationshipResolver<'_, S> {
        RelationshipResolver::new(
            &self.session,
            &self.mapper,
            &self.config.container_object_classes,
        )
    }

    // ========================================================================
    // Bound handles
    // ========================================================================

    /// Reads a user into a bound handle.
    pub async fn bound_user(&self, full_name: &str) -> StoreResult<Option<BoundEntity<User>>> {
        Ok(self.fetch::<User>(full_name).await?.map(BoundEntity::bound))
    }

    /// Reads a group, with its parent chain, into a bound handle.
    pub async fn bound_group(&self, name: &str) -> StoreResult<Option<BoundEntity<Group>>> {
        Ok(self.get_group(name).await?.map(BoundEntity::bound))
    }

    /// Reads a role into a bound handle.
    pub async fn bound_role(&self, name: &str) -> StoreResult<Option<BoundEntity<Role>>> {
        Ok(self.fetch::<Role>(name).await?.map(BoundEntity::bound))
    }

    /// Binds an unbound handle as a new entry, carrying any mutations
    /// buffered on it.
    ///
    /// ## Errors
    ///
    /// Returns `StoreError::Duplicate` if the handle is already bound or the
    /// name or DN is taken, and `StoreError::NotFoundByName` if the handle
    /// was removed.
    pub async fn bind<T: DirectoryBacked>(&self, handle: &mut BoundEntity<T>) -> StoreResult<()> {
        let kind = T::KIND;
        match handle.state() {
            EntityState::Unbound => {}
            EntityState::Bound => {
                return Err(StoreError::duplicate(kind.as_str(), "name", handle.key()));
            }
            EntityState::Removed => {
                return Err(StoreError::not_found_by_name(kind.as_str(), handle.key()));
            }
        }

        if !self
            .resolver()
            .find_by_name(kind, handle.key())
            .await?
            .is_empty()
        {
            return Err(StoreError::duplicate(kind.as_str(), "name", handle.key()));
        }
        self.ensure_container(kind).await?;

        let entry = self.mapper.to_entry(handle.entity_ref());
        match self.session.bind(&entry).await {
            Ok(()) => {}
            Err(e) if e.is_already_exists() => {
                return Err(StoreError::duplicate(kind.as_str(), "dn", entry.dn));
            }
            Err(e) => return Err(e.into()),
        }

        info!(kind = %kind, dn = %entry.dn, "Created entry");
        handle
            .entity_mut()
            .set_link(Some(StoreLink::new(self.id, entry.dn)));
        handle.mark_bound();
        Ok(())
    }

    /// Writes a bound handle's pending mutations back in one rebind.
    ///
    /// Returns `true` if anything was written.
    pub async fn commit<T: DirectoryBacked>(
        &self,
        handle: &mut BoundEntity<T>,
    ) -> StoreResult<bool> {
        Ok(handle.commit(self).await?)
    }

    /// Destroys a bound handle's entry and marks the handle removed.
    pub async fn unbind<T: DirectoryBacked>(
        &self,
        handle: &mut BoundEntity<T>,
    ) -> StoreResult<()> {
        if handle.state() != EntityState::Bound {
            return Err(StoreError::not_found_by_name(T::KIND.as_str(), handle.key()));
        }
        self.destroy_entry(handle.entity_ref()).await?;
        handle.mark_removed();
        Ok(())
    }

    // ========================================================================
    // Internals
    // ========================================================================

    async fn ensure_container(&self, kind: IdentityKind) -> StoreResult<()> {
        self.resolver()
            .ensure_container_exists(self.mapper.container_dn(kind))
            .await?;
        Ok(())
    }

    /// Looks an entity up by key. More than one match is an error.
    async fn fetch<T: Materialize>(&self, key: &str) -> StoreResult<Option<T>> {
        let entries = self.resolver().find_by_name(T::KIND, key).await?;
        match entries.as_slice() {
            [] => Ok(None),
            [entry] => Ok(Some(T::from_entry(&self.mapper, entry)?)),
            _ => Err(StoreError::Ambiguous {
                entity_type: T::KIND.as_str(),
                name: key.to_string(),
                count: entries.len(),
            }),
        }
    }

    async fn require<T: Materialize>(&self, key: &str) -> StoreResult<T> {
        self.fetch(key)
            .await?
            .ok_or_else(|| StoreError::not_found_by_name(T::KIND.as_str(), key))
    }

    /// Rejects handles linked to another store. Returns whether the handle
    /// is linked to this one.
    fn ensure_owned<T: IdentityType>(&self, handle: &T) -> StoreResult<bool> {
        match handle.link() {
            None => Ok(false),
            Some(link) if link.belongs_to(self.id) => Ok(true),
            Some(link) => Err(StoreError::type_mismatch(
                T::KIND.as_str(),
                format!("'{}' is bound to store {}", handle.key(), link.store_id),
            )),
        }
    }

    /// The handle itself when it came from this store, otherwise the
    /// stored entity of the same key.
    async fn canonical<T: Materialize>(&self, handle: &T) -> StoreResult<T> {
        if self.ensure_owned(handle)? {
            Ok(handle.clone())
        } else {
            self.require(handle.key()).await
        }
    }

    /// Re-reads the entity behind a handle. A caller's handle does not see
    /// relationship changes made through other calls, so writes start here.
    async fn stored<T: Materialize>(&self, handle: &T) -> StoreResult<T> {
        self.ensure_owned(handle)?;
        self.require(handle.key()).await
    }

    /// Applies one mutation to the stored entity and writes it back.
    async fn update<T, F>(&self, handle: &mut T, mutate: F) -> StoreResult<()>
    where
        T: Materialize,
        F: FnOnce(&mut BoundEntity<T>) -> LdapResult<bool> + Send,
    {
        let mut bound = BoundEntity::bound(self.stored(&*handle).await?);
        mutate(&mut bound)?;
        bound.commit(self).await?;
        *handle = bound.into_inner();
        Ok(())
    }

    async fn values_of<T: Materialize>(
        &self,
        handle: &T,
        name: &str,
    ) -> StoreResult<Option<Vec<String>>> {
        let entity = self.canonical(handle).await?;
        Ok(entity.attribute_values(name).map(<[String]>::to_vec))
    }

    async fn attributes_of<T: Materialize>(&self, handle: &T) -> StoreResult<Attributes> {
        Ok(self.canonical(handle).await?.attributes().clone())
    }

    /// Destroys an entity's entry, then unlinks every reference to it.
    async fn destroy_entry(&self, entity: EntityRef<'_>) -> StoreResult<()> {
        let kind = entity.kind();
        let dn = self.mapper.dn_of(entity);

        match self.session.destroy(&dn).await {
            Ok(()) => {}
            Err(e) if e.is_no_such_object() => {
                return Err(StoreError::not_found_by_name(kind.as_str(), entity.key()));
            }
            Err(e) => return Err(e.into()),
        }

        let referrer_base = match kind {
            IdentityKind::User => self.mapper.container_dn(IdentityKind::Role),
            IdentityKind::Group | IdentityKind::Role => {
                self.mapper.container_dn(IdentityKind::Group)
            }
        };
        let unlinked = self.resolver().unlink_referrers(referrer_base, &dn).await?;

        info!(kind = %kind, dn = %dn, unlinked, "Removed entry");
        Ok(())
    }

    /// Re-serializes an entity and replaces its entry.
    async fn write_back(&self, entity: EntityRef<'_>) -> LdapResult<()> {
        let mut entry = self.mapper.to_entry(entity);
        match self.session.lookup(&entry.dn).await? {
            Some(existing) => {
                self.mapper
                    .carry_foreign_members(entity.kind(), &existing, &mut entry);
                self.session.replace(&existing, &entry).await
            }
            None => self.session.rebind(&entry).await,
        }
    }
}

#[async_trait]
impl<S: DirectorySession> ChangeHandler for LdapIdentityStore<S> {
    async fn on_change(&self, notification: ChangeNotification<'_>) -> LdapResult<()> {
        debug!(
            kind = %notification.entity.kind(),
            key = %notification.entity.key(),
            mutations = notification.mutations,
            "Writing entry back"
        );
        self.write_back(notification.entity).await
    }
}

#[async_trait]
impl<S: DirectorySession> IdentityStore for LdapIdentityStore<S> {
    // === Users ===

    #[instrument(skip(self))]
    async fn create_user(&self, full_name: &str) -> StoreResult<User> {
        let mut handle = BoundEntity::unbound(User::from_full_name(full_name)?);
        self.bind(&mut handle).await?;
        Ok(handle.into_inner())
    }

    #[instrument(skip(self, user), fields(user = %user.id))]
    async fn remove_user(&self, user: &User) -> StoreResult<()> {
        self.ensure_owned(user)?;
        self.destroy_entry(EntityRef::User(user)).await
    }

    #[instrument(skip(self))]
    async fn get_user(&self, full_name: &str) -> StoreResult<Option<User>> {
        self.fetch(full_name).await
    }

    // === Groups ===

    #[instrument(skip(self, parent), fields(parent = ?parent.map(|p| &p.name)))]
    async fn create_group(&self, name: &str, parent: Option<&Group>) -> StoreResult<Group> {
        let parent = match parent {
            Some(parent) => {
                self.ensure_owned(parent)?;
                Some(self.require::<Group>(&parent.name).await?)
            }
            None => None,
        };

        let mut handle = BoundEntity::unbound(Group::new(name));
        self.bind(&mut handle).await?;
        let mut group = handle.into_inner();

        if let Some(parent) = parent {
            let mut parent = BoundEntity::bound(parent);
            parent.modify(|p| p.add_child(name))?;
            parent.commit(self).await?;

            let mut parent = parent.into_inner();
            self.resolver().resolve_ancestry(&mut parent).await?;
            debug!(group = %name, parent = %parent.name, "Linked group to parent");
            group.parent = Some(Box::new(parent));
        }

        Ok(group)
    }

    #[instrument(skip(self, group), fields(group = %group.name))]
    async fn remove_group(&self, group: &Group) -> StoreResult<()> {
        self.ensure_owned(group)?;
        self.destroy_entry(EntityRef::Group(group)).await
    }

    #[instrument(skip(self))]
    async fn get_group(&self, name: &str) -> StoreResult<Option<Group>> {
        let Some(mut group) = self.fetch::<Group>(name).await? else {
            return Ok(None);
        };
        self.resolver().resolve_ancestry(&mut group).await?;
        Ok(Some(group))
    }

    // === Roles ===

    #[instrument(skip(self))]
    async fn create_role(&self, name: &str) -> StoreResult<Role> {
        let mut handle = BoundEntity::unbound(Role::new(name));
        self.bind(&mut handle).await?;
        Ok(handle.into_inner())
    }

    #[instrument(skip(self, role), fields(role = %role.name))]
    async fn remove_role(&self, role: &Role) -> StoreResult<()> {
        self.ensure_owned(role)?;
        self.destroy_entry(EntityRef::Role(role)).await
    }

    #[instrument(skip(self))]
    async fn get_role(&self, name: &str) -> StoreResult<Option<Role>> {
        self.fetch(name).await
    }

    // === Memberships ===

    #[instrument(
        skip(self, role, user, group),
        fields(role = %role.name, user = %user.id, group = %group.name)
    )]
    async fn create_membership(
        &self,
        role: &Role,
        user: &User,
        group: &Group,
    ) -> StoreResult<Membership> {
        self.ensure_owned(role)?;
        self.ensure_owned(user)?;
        self.ensure_owned(group)?;

        let mut role = BoundEntity::bound(self.require::<Role>(&role.name).await?);
        let user = self.require::<User>(&user.full_name).await?;
        let mut group = BoundEntity::bound(self.require::<Group>(&group.name).await?);

        role.modify(|r| r.add_member(&user.id))?;
        let role_name = role.name.clone();
        group.modify(|g| g.add_role(&role_name))?;

        let role_written = role.commit(self).await?;
        let group_written = group.commit(self).await?;
        if role_written || group_written {
            info!(role = %role_name, user = %user.id, group = %group.name, "Created membership");
        } else {
            debug!(role = %role_name, user = %user.id, group = %group.name, "Membership already present");
        }

        let mut group = group.into_inner();
        self.resolver().resolve_ancestry(&mut group).await?;
        Ok(Membership::new(role.into_inner(), user, group))
    }

    #[instrument(
        skip(self, role, user, group),
        fields(role = %role.name, user = %user.id, group = %group.name)
    )]
    async fn remove_membership(
        &self,
        role: &Role,
        user: &User,
        group: &Group,
    ) -> StoreResult<()> {
        self.ensure_owned(role)?;
        self.ensure_owned(user)?;
        self.ensure_owned(group)?;

        let mut role = BoundEntity::bound(self.require::<Role>(&role.name).await?);
        let user = self.require::<User>(&user.full_name).await?;
        let mut group = BoundEntity::bound(self.require::<Group>(&group.name).await?);

        role.modify(|r| r.remove_member(&user.id))?;
        let role_name = role.name.clone();
        group.modify(|g| g.remove_role(&role_name))?;

        role.commit(self).await?;
        group.commit(self).await?;
        info!(role = %role_name, user = %user.id, group = %group.name, "Removed membership");
        Ok(())
    }

    async fn get_membership(
        &self,
        _role: &Role,
        _user: &User,
        _group: &Group,
    ) -> StoreResult<Option<Membership>> {
        Err(StoreError::unsupported("get_membership"))
    }

    // === Queries ===

    async fn query_users(&self, _query: &UserQuery, _range: Range) -> StoreResult<Vec<User>> {
        Err(StoreError::unsupported("query_users"))
    }

    async fn query_groups(&self, _query: &GroupQuery, _range: Range) -> StoreResult<Vec<Group>> {
        Err(StoreError::unsupported("query_groups"))
    }

    async fn query_roles(&self, _query: &RoleQuery, _range: Range) -> StoreResult<Vec<Role>> {
        Err(StoreError::unsupported("query_roles"))
    }

    async fn query_memberships(
        &self,
        _query: &MembershipQuery,
        _range: Range,
    ) -> StoreResult<Vec<Membership>> {
        Err(StoreError::unsupported("query_memberships"))
    }

    // === User attributes ===

    #[instrument(skip(self, user, values), fields(user = %user.id))]
    async fn set_user_attribute(
        &self,
        user: &mut User,
        name: &str,
        values: Vec<String>,
    ) -> StoreResult<()> {
        self.update(user, |u| u.set_attribute(name, values)).await
    }

    #[instrument(skip(self, user), fields(user = %user.id))]
    async fn remove_user_attribute(&self, user: &mut User, name: &str) -> StoreResult<()> {
        self.update(user, |u| u.remove_attribute(name)).await
    }

    async fn get_user_attribute_values(
        &self,
        user: &User,
        name: &str,
    ) -> StoreResult<Option<Vec<String>>> {
        self.values_of(user, name).await
    }

    async fn get_user_attributes(&self, user: &User) -> StoreResult<Attributes> {
        self.attributes_of(user).await
    }

    // === Group attributes ===

    #[instrument(skip(self, group, values), fields(group = %group.name))]
    async fn set_group_attribute(
        &self,
        group: &mut Group,
        name: &str,
        values: Vec<String>,
    ) -> StoreResult<()> {
        let parent = group.parent.take();
        let result = self.update(group, |g| g.set_attribute(name, values)).await;
        group.parent = group.parent.take().or(parent);
        result
    }

    #[instrument(skip(self, group), fields(group = %group.name))]
    async fn remove_group_attribute(&self, group: &mut Group, name: &str) -> StoreResult<()> {
        let parent = group.parent.take();
        let result = self.update(group, |g| g.remove_attribute(name)).await;
        group.parent = group.parent.take().or(parent);
        result
    }

    async fn get_group_attribute_values(
        &self,
        group: &Group,
        name: &str,
    ) -> StoreResult<Option<Vec<String>>> {
        self.values_of(group, name).await
    }

    async fn get_group_attributes(&self, group: &Group) -> StoreResult<Attributes> {
        self.attributes_of(group).await
    }

    // === Role attributes ===

    #[instrument(skip(self, role, values), fields(role = %role.name))]
    async fn set_role_attribute(
        &self,
        role: &mut Role,
        name: &str,
        values: Vec<String>,
    ) -> StoreResult<()> {
        self.update(role, |r| r.set_attribute(name, values)).await
    }

    #[instrument(skip(self, role), fields(role = %role.name))]
    async fn remove_role_attribute(&self, role: &mut Role, name: &str) -> StoreResult<()> {
        self.update(role, |r| r.remove_attribute(name)).await
    }

    async fn get_role_attribute_values(
        &self,
        role: &Role,
        name: &str,
    ) -> StoreResult<Option<Vec<String>>> {
        self.values_of(role, name).await
    }

    async fn get_role_attributes(&self, role: &Role) -> StoreResult<Attributes> {
        self.attributes_of(role).await
    }
}
