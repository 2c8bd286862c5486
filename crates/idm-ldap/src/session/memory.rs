//! In-memory directory tree.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::entry::{normalize_dn, parent_dn, parse_rdn, DirectoryEntry, EqualityFilter};
use crate::error::{LdapError, LdapResult, RC_NOT_ALLOWED_ON_NON_LEAF};

use super::DirectorySession;

/// Kind of directory operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpKind {
    /// Entry add.
    Bind,
    /// Entry replace.
    Rebind,
    /// Entry delete.
    Destroy,
    /// Search.
    Search,
    /// Container add.
    CreateSubcontext,
    /// Single entry read.
    Lookup,
}

/// A recorded directory operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryOp {
    /// Entry add at a DN.
    Bind(String),
    /// Entry replace at a DN.
    Rebind(String),
    /// Entry delete at a DN.
    Destroy(String),
    /// Search below a base DN.
    Search {
        /// Search base.
        base_dn: String,
        /// Rendered filter.
        filter: String,
    },
    /// Container add at a DN.
    CreateSubcontext(String),
    /// Read of a DN.
    Lookup(String),
}

impl DirectoryOp {
    /// The operation kind.
    #[must_use]
    pub const fn kind(&self) -> OpKind {
        match self {
            Self::Bind(_) => OpKind::Bind,
            Self::Rebind(_) => OpKind::Rebind,
            Self::Destroy(_) => OpKind::Destroy,
            Self::Search { .. } => OpKind::Search,
            Self::CreateSubcontext(_) => OpKind::CreateSubcontext,
            Self::Lookup(_) => OpKind::Lookup,
        }
    }

    /// The DN the operation addressed (the base DN for searches).
    #[must_use]
    pub fn dn(&self) -> &str {
        match self {
            Self::Bind(dn)
            | Self::Rebind(dn)
            | Self::Destroy(dn)
            | Self::CreateSubcontext(dn)
            | Self::Lookup(dn) => dn,
            Self::Search { base_dn, .. } => base_dn,
        }
    }
}

#[derive(Debug, Default)]
struct DirectoryState {
    /// Entries keyed by normalized DN.
    entries: BTreeMap<String, DirectoryEntry>,
    log: Vec<DirectoryOp>,
    /// Pending injected failures: kind, operations of that kind to let
    /// through first, result code.
    failures: Vec<(OpKind, usize, u32)>,
}

impl DirectoryState {
    fn record(&mut self, op: DirectoryOp) -> LdapResult<()> {
        let kind = op.kind();
        let dn = op.dn().to_string();
        self.log.push(op);

        let Some(index) = self.failures.iter().position(|(k, _, _)| *k == kind) else {
            return Ok(());
        };
        let skip = &mut self.failures[index].1;
        if *skip > 0 {
            *skip -= 1;
            return Ok(());
        }
        let (_, _, code) = self.failures.remove(index);
        Err(LdapError::from_result_code(code, &dn, "injected failure"))
    }

    fn add(&mut self, entry: &DirectoryEntry) -> LdapResult<()> {
        let key = normalize_dn(&entry.dn);
        if self.entries.contains_key(&key) {
            return Err(LdapError::AlreadyExists(entry.dn.clone()));
        }
        if let Some(parent) = parent_dn(&entry.dn) {
            if !self.entries.contains_key(&normalize_dn(&parent)) {
                return Err(LdapError::NoSuchObject(parent));
            }
        }
        self.entries.insert(key, entry.clone());
        Ok(())
    }

    fn has_children(&self, key: &str) -> bool {
        let suffix = format!(",{key}");
        self.entries.keys().any(|k| k.ends_with(&suffix))
    }
}

/// A directory tree held in memory.
///
/// DNs, attribute names and values compare case-insensitively. Searches
/// return every matching entry below the base DN. Clones share the same
/// tree, so a test can keep a handle while a store owns another.
///
/// Every operation is recorded, and [`fail_next`](Self::fail_next) makes
/// the next operation of a kind fail with a given result code.
#[derive(Debug, Clone, Default)]
pub struct MemoryDirectory {
    state: Arc<Mutex<DirectoryState>>,
}

impl MemoryDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a directory holding a naming context entry for `suffix`.
    #[must_use]
    pub fn with_suffix(suffix: &str) -> Self {
        let directory = Self::new();
        let mut entry = DirectoryEntry::new(suffix)
            .with_object_classes(&["top".to_string(), "domain".to_string()]);
        if let Some((attr, value, _)) = parse_rdn(suffix) {
            entry.set(attr, vec![value.to_string()]);
        }
        directory.insert(entry);
        directory
    }

    /// Inserts or replaces an entry without recording an operation.
    pub fn insert(&self, entry: DirectoryEntry) {
        self.state
            .lock()
            .entries
            .insert(normalize_dn(&entry.dn), entry);
    }

    /// Reads an entry without recording an operation.
    #[must_use]
    pub fn entry(&self, dn: &str) -> Option<DirectoryEntry> {
        self.state.lock().entries.get(&normalize_dn(dn)).cloned()
    }

    /// Checks if an entry exists.
    #[must_use]
    pub fn contains(&self, dn: &str) -> bool {
        self.state.lock().entries.contains_key(&normalize_dn(dn))
    }

    /// Number of entries in the tree.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    /// Checks if the tree is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Operations issued so far, oldest first.
    #[must_use]
    pub fn operations(&self) -> Vec<DirectoryOp> {
        self.state.lock().log.clone()
    }

    /// Number of recorded operations of a kind.
    #[must_use]
    pub fn count(&self, kind: OpKind) -> usize {
        self.state
            .lock()
            .log
            .iter()
            .filter(|op| op.kind() == kind)
            .count()
    }

    /// Forgets recorded operations.
    pub fn clear_operations(&self) {
        self.state.lock().log.clear();
    }

    /// Makes the next operation of `kind` fail with result code `code`.
    pub fn fail_next(&self, kind: OpKind, code: u32) {
        self.fail_nth(kind, 0, code);
    }

    /// Lets `skip` operations of `kind` through, then fails the next one
    /// with result code `code`.
    pub fn fail_nth(&self, kind: OpKind, skip: usize, code: u32) {
        self.state.lock().failures.push((kind, skip, code));
    }
}

#[async_trait]
impl DirectorySession for MemoryDirectory {
    async fn bind(&self, entry: &DirectoryEntry) -> LdapResult<()> {
        let mut state = self.state.lock();
        state.record(DirectoryOp::Bind(entry.dn.clone()))?;
        state.add(entry)
    }

    async fn rebind(&self, entry: &DirectoryEntry) -> LdapResult<()> {
        let mut state = self.state.lock();
        state.record(DirectoryOp::Rebind(entry.dn.clone()))?;

        let key = normalize_dn(&entry.dn);
        if let Some(existing) = state.entries.get_mut(&key) {
            *existing = entry.clone();
            return Ok(());
        }
        state.add(entry)
    }

    async fn destroy(&self, dn: &str) -> LdapResult<()> {
        let mut state = self.state.lock();
        state.record(DirectoryOp::Destroy(dn.to_string()))?;

        let key = normalize_dn(dn);
        if !state.entries.contains_key(&key) {
            return Err(LdapError::NoSuchObject(dn.to_string()));
        }
        if state.has_children(&key) {
            return Err(LdapError::Protocol {
                code: RC_NOT_ALLOWED_ON_NON_LEAF,
                message: format!("{dn} has subordinate entries"),
            });
        }
        state.entries.remove(&key);
        Ok(())
    }

    async fn search(
        &self,
        base_dn: &str,
        filter: &EqualityFilter,
        attributes: &[&str],
    ) -> LdapResult<Vec<DirectoryEntry>> {
        let mut state = self.state.lock();
        state.record(DirectoryOp::Search {
            base_dn: base_dn.to_string(),
            filter: filter.to_filter_string(),
        })?;

        let base = normalize_dn(base_dn);
        if !state.entries.contains_key(&base) {
            return Err(LdapError::NoSuchObject(base_dn.to_string()));
        }

        let suffix = format!(",{base}");
        Ok(state
            .entries
            .iter()
            .filter(|(key, entry)| key.ends_with(&suffix) && entry.matches(filter))
            .map(|(_, entry)| {
                let mut entry = entry.clone();
                entry.retain_attrs(attributes);
                entry
            })
            .collect())
    }

    async fn create_subcontext(&self, entry: &DirectoryEntry) -> LdapResult<()> {
        let mut state = self.state.lock();
        state.record(DirectoryOp::CreateSubcontext(entry.dn.clone()))?;
        state.add(entry)
    }

    async fn lookup(&self, dn: &str) -> LdapResult<Option<DirectoryEntry>> {
        let mut state = self.state.lock();
        state.record(DirectoryOp::Lookup(dn.to_string()))?;
        Ok(state.entries.get(&normalize_dn(dn)).cloned())
    }
}
