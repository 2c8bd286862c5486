//! Change notification channel.
//!
//! An entity read from or written to the directory is wrapped in a
//! [`BoundEntity`]. Local mutations only mark the handle dirty; nothing is
//! written until [`BoundEntity::commit`] hands one [`ChangeNotification`]
//! to a [`ChangeHandler`], which writes the entry back. Several attribute
//! changes made before a commit therefore cost one write-back.
//!
//! Handles that were never bound buffer their mutations; the initial bind
//! carries them.

use std::ops::Deref;

use async_trait::async_trait;
use idm_model::{AttributeHolder, Group, IdentityKind, IdentityType, Role, User};

use crate::error::{LdapError, LdapResult};

/// Lifecycle of a bound handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityState {
    /// Exists only as a local value.
    Unbound,
    /// Backed by a directory entry.
    Bound,
    /// Its entry was destroyed; the handle must be discarded.
    Removed,
}

/// A borrowed entity of any kind.
#[derive(Debug, Clone, Copy)]
pub enum EntityRef<'a> {
    /// A user.
    User(&'a User),
    /// A group.
    Group(&'a Group),
    /// A role.
    Role(&'a Role),
}

impl EntityRef<'_> {
    /// The entity kind.
    #[must_use]
    pub const fn kind(&self) -> IdentityKind {
        match self {
            Self::User(_) => IdentityKind::User,
            Self::Group(_) => IdentityKind::Group,
            Self::Role(_) => IdentityKind::Role,
        }
    }

    /// The entity key.
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Self::User(user) => user.key(),
            Self::Group(group) => group.key(),
            Self::Role(role) => role.key(),
        }
    }
}

/// Entities that can be persisted as directory entries.
pub trait DirectoryBacked: IdentityType + AttributeHolder + Send + Sync {
    /// Borrows the entity as an [`EntityRef`].
    fn entity_ref(&self) -> EntityRef<'_>;
}

impl DirectoryBacked for User {
    fn entity_ref(&self) -> EntityRef<'_> {
        EntityRef::User(self)
    }
}

impl DirectoryBacked for Group {
    fn entity_ref(&self) -> EntityRef<'_> {
        EntityRef::Group(self)
    }
}

impl DirectoryBacked for Role {
    fn entity_ref(&self) -> EntityRef<'_> {
        EntityRef::Role(self)
    }
}

/// Emitted when a bound entity with pending mutations is committed.
#[derive(Debug, Clone, Copy)]
pub struct ChangeNotification<'a> {
    /// The entity in its current state.
    pub entity: EntityRef<'a>,
    /// Number of mutations folded into this notification.
    pub mutations: usize,
}

/// Receives change notifications and persists the entity.
#[async_trait]
pub trait ChangeHandler: Send + Sync {
    /// Writes the notified entity back.
    async fn on_change(&self, notification: ChangeNotification<'_>) -> LdapResult<()>;
}

/// An entity paired with its directory lifecycle.
#[derive(Debug, Clone)]
pub struct BoundEntity<T> {
    entity: T,
    state: EntityState,
    pending: usize,
}

impl<T: DirectoryBacked> BoundEntity<T> {
    /// Wraps a local entity that has no directory entry yet.
    #[must_use]
    pub const fn unbound(entity: T) -> Self {
        Self {
            entity,
            state: EntityState::Unbound,
            pending: 0,
        }
    }

    /// Wraps an entity that mirrors its directory entry.
    #[must_use]
    pub const fn bound(entity: T) -> Self {
        Self {
            entity,
            state: EntityState::Bound,
            pending: 0,
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> EntityState {
        self.state
    }

    /// Number of mutations not yet written back.
    #[must_use]
    pub const fn pending(&self) -> usize {
        self.pending
    }

    /// Checks if there are mutations not yet written back.
    #[must_use]
    pub const fn is_dirty(&self) -> bool {
        self.pending > 0
    }

    /// Applies a mutation. `f` returns whether it changed anything.
    ///
    /// ## Errors
    ///
    /// Returns `LdapError::Removed` if the entry was removed.
    pub fn modify(&mut self, f: impl FnOnce(&mut T) -> bool) -> LdapResult<bool> {
        self.ensure_not_removed()?;
        let changed = f(&mut self.entity);
        if changed {
            self.pending += 1;
        }
        Ok(changed)
    }

    /// Sets an attribute. Empty `values` removes it.
    pub fn set_attribute(&mut self, name: &str, values: Vec<String>) -> LdapResult<bool> {
        self.modify(|entity| entity.set_attribute(name, values))
    }

    /// Removes an attribute.
    pub fn remove_attribute(&mut self, name: &str) -> LdapResult<bool> {
        self.modify(|entity| entity.remove_attribute(name).is_some())
    }

    /// Writes pending mutations back through `handler`.
    ///
    /// Returns `true` if a notification was sent. Unbound handles keep
    /// their mutations for the initial bind.
    ///
    /// ## Errors
    ///
    /// Returns `LdapError::Removed` if the entry was removed, or the
    /// handler's error. A failed write-back leaves the mutations pending.
    pub async fn commit<H>(&mut self, handler: &H) -> LdapResult<bool>
    where
        H: ChangeHandler + ?Sized,
    {
        self.ensure_not_removed()?;
        if self.state == EntityState::Unbound || self.pending == 0 {
            return Ok(false);
        }

        handler
            .on_change(ChangeNotification {
                entity: self.entity.entity_ref(),
                mutations: self.pending,
            })
            .await?;
        self.pending = 0;
        Ok(true)
    }

    /// Records that the entity's entry now exists with its current state.
    pub(crate) fn mark_bound(&mut self) {
        self.state = EntityState::Bound;
        self.pending = 0;
    }

    /// Records that the entity's entry was destroyed.
    pub(crate) fn mark_removed(&mut self) {
        self.state = EntityState::Removed;
        self.pending = 0;
    }

    /// Mutable access for store internals (link maintenance).
    pub(crate) fn entity_mut(&mut self) -> &mut T {
        &mut self.entity
    }

    /// Unwraps the entity.
    #[must_use]
    pub fn into_inner(self) -> T {
        self.entity
    }

    fn ensure_not_removed(&self) -> LdapResult<()> {
        if self.state == EntityState::Removed {
            return Err(LdapError::Removed {
                kind: T::KIND,
                dn: self
                    .entity
                    .link()
                    .map_or_else(|| self.entity.key().to_string(), |l| l.external_id.clone()),
            });
        }
        Ok(())
    }
}

impl<T> Deref for BoundEntity<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.entity
    }
}
