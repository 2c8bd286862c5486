//! The directory session seam.
//!
//! The store issues every directory operation through [`DirectorySession`].
//! [`LdapSession`] talks to a real server over ldap3; [`MemoryDirectory`]
//! keeps a directory tree in memory for tests and embedded use.

mod ldap;
mod memory;

pub use ldap::LdapSession;
pub use memory::{DirectoryOp, MemoryDirectory, OpKind};

use async_trait::async_trait;

use crate::entry::{DirectoryEntry, EqualityFilter};
use crate::error::LdapResult;

/// An already-connected directory context.
///
/// Failures map onto [`LdapError`](crate::LdapError): a missing entry is
/// `NoSuchObject`, a naming collision is `AlreadyExists`, anything else the
/// server rejects is `Protocol`.
#[async_trait]
pub trait DirectorySession: Send + Sync {
    /// Adds a new entry.
    async fn bind(&self, entry: &DirectoryEntry) -> LdapResult<()>;

    /// Replaces an entry's attributes wholesale, adding the entry if it
    /// does not exist.
    async fn rebind(&self, entry: &DirectoryEntry) -> LdapResult<()>;

    /// Replaces `existing` with `entry` when the caller has already read
    /// the current entry.
    async fn replace(&self, existing: &DirectoryEntry, entry: &DirectoryEntry) -> LdapResult<()> {
        let _ = existing;
        self.rebind(entry).await
    }

    /// Deletes a leaf entry.
    async fn destroy(&self, dn: &str) -> LdapResult<()>;

    /// Returns the entries below `base_dn` matching `filter`, with only the
    /// requested attributes (all attributes when `attributes` is empty).
    async fn search(
        &self,
        base_dn: &str,
        filter: &EqualityFilter,
        attributes: &[&str],
    ) -> LdapResult<Vec<DirectoryEntry>>;

    /// Creates a container entry.
    async fn create_subcontext(&self, entry: &DirectoryEntry) -> LdapResult<()> {
        self.bind(entry).await
    }

    /// Reads one entry by DN. A missing entry is `Ok(None)`.
    async fn lookup(&self, dn: &str) -> LdapResult<Option<DirectoryEntry>>;
}
