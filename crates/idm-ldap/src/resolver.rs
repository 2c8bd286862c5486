//! Relationship resolution.
//!
//! The directory only stores forward references (`member` on the parent
//! group or on the role). Everything else is found by reverse search:
//! a group's parent is the group whose `member` names it.

use std::collections::HashSet;

use idm_model::{Group, IdentityKind};
use tracing::{debug, info, warn};

use crate::entry::{dn_eq, parse_rdn, unescape_rdn_value, DirectoryEntry, EqualityFilter};
use crate::error::{LdapError, LdapResult};
use crate::mapper::{finish_members, DirectoryMapper};
use crate::schema::{CN, MEMBER};
use crate::session::DirectorySession;

/// Resolves relationships through a directory session.
pub struct RelationshipResolver<'a, S: ?Sized> {
    session: &'a S,
    mapper: &'a DirectoryMapper,
    container_object_classes: &'a [String],
}

impl<'a, S> RelationshipResolver<'a, S>
where
    S: DirectorySession + ?Sized,
{
    /// Creates a resolver.
    #[must_use]
    pub const fn new(
        session: &'a S,
        mapper: &'a DirectoryMapper,
        container_object_classes: &'a [String],
    ) -> Self {
        Self {
            session,
            mapper,
            container_object_classes,
        }
    }

    /// Entries of `kind` whose `cn` equals `name`. A missing container
    /// yields no entries.
    pub async fn find_by_name(
        &self,
        kind: IdentityKind,
        name: &str,
    ) -> LdapResult<Vec<DirectoryEntry>> {
        let base = self.mapper.container_dn(kind);
        match self
            .session
            .search(base, &EqualityFilter::eq(CN, name), &[])
            .await
        {
            Err(e) if e.is_no_such_object() => Ok(Vec::new()),
            other => other,
        }
    }

    /// Reads a group by name without resolving its parent.
    pub async fn fetch_group(&self, name: &str) -> LdapResult<Option<Group>> {
        let entries = self.find_by_name(IdentityKind::Group, name).await?;
        if entries.len() > 1 {
            warn!(group = %name, count = entries.len(), "Several group entries share a name, using the first");
        }
        entries
            .first()
            .map(|entry| self.mapper.group_from_entry(entry))
            .transpose()
    }

    /// Finds the parent of a group by reverse search.
    ///
    /// Returns `None` for a top-level group.
    pub async fn resolve_parent(&self, group_name: &str) -> LdapResult<Option<Group>> {
        let group_dn = self.mapper.group_dn(group_name);
        let base = self.mapper.container_dn(IdentityKind::Group);
        let referrers = self.referrers(base, &group_dn, &[CN]).await?;

        if referrers.len() > 1 {
            warn!(
                group = %group_name,
                count = referrers.len(),
                "Group is a member of several groups, using the first as parent"
            );
        }
        let Some(parent) = referrers.first() else {
            return Ok(None);
        };
        let parent_name = parent.first(CN).ok_or_else(|| {
            LdapError::corrupt(IdentityKind::Group, &parent.dn, "missing cn attribute")
        })?;

        debug!(group = %group_name, parent = %parent_name, "Resolved parent group");
        self.fetch_group(parent_name).await
    }

    /// Attaches the full parent chain to `group`.
    pub async fn resolve_ancestry(&self, group: &mut Group) -> LdapResult<()> {
        let mut chain: Vec<Group> = Vec::new();
        let mut seen = HashSet::from([group.name.to_lowercase()]);
        let mut current = group.name.clone();

        while let Some(parent) = self.resolve_parent(&current).await? {
            if !seen.insert(parent.name.to_lowercase()) {
                warn!(group = %group.name, parent = %parent.name, "Group hierarchy contains a cycle");
                break;
            }
            current.clone_from(&parent.name);
            chain.push(parent);
        }

        group.parent = chain.into_iter().rev().fold(None, |parent, mut ancestor| {
            ancestor.parent = parent;
            Some(Box::new(ancestor))
        });
        Ok(())
    }

    /// Creates the container at `dn` unless it exists.
    ///
    /// Returns `true` if it was created.
    pub async fn ensure_container_exists(&self, dn: &str) -> LdapResult<bool> {
        if self.session.lookup(dn).await?.is_some() {
            return Ok(false);
        }

        let mut entry = DirectoryEntry::new(dn).with_object_classes(self.container_object_classes);
        if let Some((attr, value, _)) = parse_rdn(dn) {
            entry.set(attr, vec![unescape_rdn_value(value)]);
        }

        match self.session.create_subcontext(&entry).await {
            Ok(()) => {
                info!(dn = %dn, "Created container");
                Ok(true)
            }
            Err(e) if e.is_already_exists() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Entries below `base_dn` whose `member` names `target_dn`.
    pub async fn referrers(
        &self,
        base_dn: &str,
        target_dn: &str,
        attributes: &[&str],
    ) -> LdapResult<Vec<DirectoryEntry>> {
        match self
            .session
            .search(base_dn, &EqualityFilter::eq(MEMBER, target_dn), attributes)
            .await
        {
            Err(e) if e.is_no_such_object() => Ok(Vec::new()),
            other => other,
        }
    }

    /// Removes `target_dn` from the `member` attribute of every entry
    /// below `base_dn` that names it. Returns the number of entries
    /// rewritten.
    pub async fn unlink_referrers(&self, base_dn: &str, target_dn: &str) -> LdapResult<usize> {
        let referrers = self.referrers(base_dn, target_dn, &[]).await?;
        let count = referrers.len();

        for mut entry in referrers {
            let remaining: Vec<String> = entry
                .get(MEMBER)
                .unwrap_or_default()
                .iter()
                .filter(|value| !dn_eq(value, target_dn))
                .cloned()
                .collect();
            entry.set(MEMBER, remaining);
            finish_members(&mut entry);

            debug!(dn = %entry.dn, member = %target_dn, "Removing dangling member reference");
            self.session.rebind(&entry).await?;
        }

        Ok(count)
    }
}
