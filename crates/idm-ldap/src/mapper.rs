//! Entity-to-entry mapping.
//!
//! Maps users, groups and roles to directory entries and back, and
//! computes entry DNs from naming conventions:
//!
//! | Kind  | DN                          | Object classes (default)                          |
//! |-------|-----------------------------|---------------------------------------------------|
//! | User  | `uid=<user id>,<users_dn>`  | top, person, organizationalPerson, inetOrgPerson  |
//! | Group | `cn=<name>,<groups_dn>`     | top, organizationalUnit                           |
//! | Role  | `cn=<name>,<roles_dn>`      | top, groupOfNames                                 |
//!
//! A group's `member` attribute lists its child groups and the roles held
//! in it. A role's `member` attribute lists its users. Parents are never
//! stored on the child.

use idm_model::{Attributes, Group, IdentityKind, Role, StoreLink, User};
use tracing::warn;
use uuid::Uuid;

use crate::config::LdapConfig;
use crate::entry::{normalize_dn, parse_rdn, unescape_rdn_value, DirectoryEntry};
use crate::error::{LdapError, LdapResult};
use crate::notify::EntityRef;
use crate::schema::{
    is_reserved, requires_member, CN, GIVEN_NAME, MAIL, MEMBER, MEMBER_PLACEHOLDER,
    ORGANIZATIONAL_UNIT, OU, SN, UID,
};

/// What a `member` DN refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberRef {
    /// A user, by user id.
    User(String),
    /// A group, by name.
    Group(String),
    /// A role, by name.
    Role(String),
    /// Anything outside the configured containers.
    Foreign,
}

/// Converts between entities and directory entries.
#[derive(Debug, Clone)]
pub struct DirectoryMapper {
    store_id: Uuid,
    users_dn: String,
    groups_dn: String,
    roles_dn: String,
    users_key: String,
    groups_key: String,
    roles_key: String,
    user_object_classes: Vec<String>,
    group_object_classes: Vec<String>,
    role_object_classes: Vec<String>,
}

impl DirectoryMapper {
    /// Creates a mapper for the store `store_id`.
    #[must_use]
    pub fn new(store_id: Uuid, config: &LdapConfig) -> Self {
        Self {
            store_id,
            users_dn: config.users_dn.trim().to_string(),
            groups_dn: config.groups_dn.trim().to_string(),
            roles_dn: config.roles_dn.trim().to_string(),
            users_key: normalize_dn(&config.users_dn),
            groups_key: normalize_dn(&config.groups_dn),
            roles_key: normalize_dn(&config.roles_dn),
            user_object_classes: config.user_object_classes.clone(),
            group_object_classes: config.group_object_classes.clone(),
            role_object_classes: config.role_object_classes.clone(),
        }
    }

    /// The owning store.
    #[must_use]
    pub const fn store_id(&self) -> Uuid {
        self.store_id
    }

    /// Container DN for a kind.
    #[must_use]
    pub fn container_dn(&self, kind: IdentityKind) -> &str {
        match kind {
            IdentityKind::User => &self.users_dn,
            IdentityKind::Group => &self.groups_dn,
            IdentityKind::Role => &self.roles_dn,
        }
    }

    // ------------------------------------------------------------------
    // DNs
    // ------------------------------------------------------------------

    /// DN of a user entry.
    #[must_use]
    pub fn user_dn(&self, user_id: &str) -> String {
        format!("{UID}={},{}", ldap3::dn_escape(user_id), self.users_dn)
    }

    /// DN of a group entry.
    #[must_use]
    pub fn group_dn(&self, name: &str) -> String {
        format!("{CN}={},{}", ldap3::dn_escape(name), self.groups_dn)
    }

    /// DN of a role entry.
    #[must_use]
    pub fn role_dn(&self, name: &str) -> String {
        format!("{CN}={},{}", ldap3::dn_escape(name), self.roles_dn)
    }

    /// DN of any entity.
    #[must_use]
    pub fn dn_of(&self, entity: EntityRef<'_>) -> String {
        match entity {
            EntityRef::User(user) => self.user_dn(&user.id),
            EntityRef::Group(group) => self.group_dn(&group.name),
            EntityRef::Role(role) => self.role_dn(&role.name),
        }
    }

    /// Classifies a `member` value.
    #[must_use]
    pub fn classify(&self, dn: &str) -> MemberRef {
        let Some((attr, raw, parent)) = parse_rdn(dn) else {
            return MemberRef::Foreign;
        };
        let value = unescape_rdn_value(raw);
        let parent = normalize_dn(&parent);

        if attr.eq_ignore_ascii_case(UID) && parent == self.users_key {
            MemberRef::User(value)
        } else if attr.eq_ignore_ascii_case(CN) && parent == self.groups_key {
            MemberRef::Group(value)
        } else if attr.eq_ignore_ascii_case(CN) && parent == self.roles_key {
            MemberRef::Role(value)
        } else {
            MemberRef::Foreign
        }
    }

    fn link(&self, dn: &str) -> Option<StoreLink> {
        Some(StoreLink::new(self.store_id, dn))
    }

    // ------------------------------------------------------------------
    // Entity to entry
    // ------------------------------------------------------------------

    /// Serializes any entity.
    #[must_use]
    pub fn to_entry(&self, entity: EntityRef<'_>) -> DirectoryEntry {
        match entity {
            EntityRef::User(user) => self.user_to_entry(user),
            EntityRef::Group(group) => self.group_to_entry(group),
            EntityRef::Role(role) => self.role_to_entry(role),
        }
    }

    /// Serializes a user.
    #[must_use]
    pub fn user_to_entry(&self, user: &User) -> DirectoryEntry {
        let mut entry = DirectoryEntry::new(self.user_dn(&user.id))
            .with_object_classes(&self.user_object_classes)
            .with_attr(UID, vec![user.id.clone()])
            .with_attr(CN, vec![user.full_name.clone()]);

        for (attr, value) in [
            (GIVEN_NAME, &user.first_name),
            (SN, &user.last_name),
            (MAIL, &user.email),
        ] {
            if let Some(value) = value {
                entry.set(attr, vec![value.clone()]);
            }
        }

        write_custom_attributes(&mut entry, &user.attributes);
        entry
    }

    /// Serializes a group.
    #[must_use]
    pub fn group_to_entry(&self, group: &Group) -> DirectoryEntry {
        let mut entry = DirectoryEntry::new(self.group_dn(&group.name))
            .with_object_classes(&self.group_object_classes)
            .with_attr(CN, vec![group.name.clone()]);
        if entry.has_object_class(ORGANIZATIONAL_UNIT) {
            entry.set(OU, vec![group.name.clone()]);
        }

        let members = group
            .children
            .iter()
            .map(|child| self.group_dn(child))
            .chain(group.roles.iter().map(|role| self.role_dn(role)))
            .collect();
        entry.set(MEMBER, members);
        finish_members(&mut entry);

        write_custom_attributes(&mut entry, &group.attributes);
        entry
    }

    /// Serializes a role.
    #[must_use]
    pub fn role_to_entry(&self, role: &Role) -> DirectoryEntry {
        let mut entry = DirectoryEntry::new(self.role_dn(&role.name))
            .with_object_classes(&self.role_object_classes)
            .with_attr(CN, vec![role.name.clone()]);

        let members = role.members.iter().map(|id| self.user_dn(id)).collect();
        entry.set(MEMBER, members);
        finish_members(&mut entry);

        write_custom_attributes(&mut entry, &role.attributes);
        entry
    }

    /// Copies `member` values of `existing` that the entity model does not
    /// represent into `entry`, so a write-back does not drop them.
    pub fn carry_foreign_members(
        &self,
        kind: IdentityKind,
        existing: &DirectoryEntry,
        entry: &mut DirectoryEntry,
    ) {
        let Some(values) = existing.get(MEMBER) else {
            return;
        };

        let mut carried = false;
        for value in values.iter().filter(|v| !is_placeholder(v)) {
            let foreign = match (kind, self.classify(value)) {
                (_, MemberRef::Foreign)
                | (IdentityKind::Role, MemberRef::Group(_) | MemberRef::Role(_))
                | (IdentityKind::Group, MemberRef::User(_)) => true,
                _ => false,
            };
            if foreign {
                carried |= entry.add_value(MEMBER, value.clone());
            }
        }

        if carried {
            finish_members(entry);
        }
    }

    // ------------------------------------------------------------------
    // Entry to entity
    // ------------------------------------------------------------------

    /// Reads a user.
    pub fn user_from_entry(&self, entry: &DirectoryEntry) -> LdapResult<User> {
        let id = required(entry, IdentityKind::User, UID)?;
        let full_name = required(entry, IdentityKind::User, CN)?;

        Ok(User {
            id,
            full_name,
            first_name: entry.first(GIVEN_NAME).map(String::from),
            last_name: entry.first(SN).map(String::from),
            email: entry.first(MAIL).map(String::from),
            attributes: read_custom_attributes(entry),
            link: self.link(&entry.dn),
        })
    }

    /// Reads a group. The parent is left unresolved.
    pub fn group_from_entry(&self, entry: &DirectoryEntry) -> LdapResult<Group> {
        let mut group = Group::new(required(entry, IdentityKind::Group, CN)?);

        for value in members(entry) {
            match self.classify(value) {
                MemberRef::Group(name) => {
                    group.add_child(&name);
                }
                MemberRef::Role(name) => {
                    group.add_role(&name);
                }
                MemberRef::User(_) | MemberRef::Foreign => {}
            }
        }

        group.attributes = read_custom_attributes(entry);
        group.link = self.link(&entry.dn);
        Ok(group)
    }

    /// Reads a role.
    pub fn role_from_entry(&self, entry: &DirectoryEntry) -> LdapResult<Role> {
        let mut role = Role::new(required(entry, IdentityKind::Role, CN)?);

        for value in members(entry) {
            if let MemberRef::User(id) = self.classify(value) {
                role.add_member(&id);
            }
        }

        role.attributes = read_custom_attributes(entry);
        role.link = self.link(&entry.dn);
        Ok(role)
    }
}

fn required(entry: &DirectoryEntry, kind: IdentityKind, attr: &str) -> LdapResult<String> {
    entry
        .first(attr)
        .filter(|v| !v.trim().is_empty())
        .map(String::from)
        .ok_or_else(|| LdapError::corrupt(kind, &entry.dn, format!("missing {attr} attribute")))
}

fn is_placeholder(value: &str) -> bool {
    value.trim().is_empty()
}

fn members(entry: &DirectoryEntry) -> impl Iterator<Item = &String> {
    entry
        .get(MEMBER)
        .unwrap_or_default()
        .iter()
        .filter(|v| !is_placeholder(v))
}

/// Writes the placeholder when `member` would be empty on an entry whose
/// schema requires it, and drops it once there is a real member.
pub(crate) fn finish_members(entry: &mut DirectoryEntry) {
    let real: Vec<String> = members(entry).cloned().collect();
    if !real.is_empty() {
        entry.set(MEMBER, real);
    } else if requires_member(&entry.object_classes) {
        entry.set(MEMBER, vec![MEMBER_PLACEHOLDER.to_string()]);
    } else {
        entry.remove(MEMBER);
    }
}

fn write_custom_attributes(entry: &mut DirectoryEntry, attributes: &Attributes) {
    let mut names: Vec<&String> = attributes.keys().collect();
    names.sort();

    for name in names {
        if is_reserved(name) {
            warn!(
                dn = %entry.dn,
                attribute = %name,
                "Skipping custom attribute that shadows a mapped attribute"
            );
            continue;
        }
        if let Some(values) = attributes.get(name) {
            entry.set(name, values.clone());
        }
    }
}

fn read_custom_attributes(entry: &DirectoryEntry) -> Attributes {
    entry
        .attributes()
        .filter(|(name, _)| !is_reserved(name))
        .map(|(name, values)| (name.to_string(), values.to_vec()))
        .collect()
}
