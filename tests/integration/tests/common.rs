//! Common test utilities and fixtures.

use idm_ldap::{DirectoryEntry, LdapConfig, LdapIdentityStore, MemoryDirectory, OpKind};
use tracing_subscriber::EnvFilter;

pub const SUFFIX: &str = "dc=example,dc=com";
pub const USERS_DN: &str = "ou=People,dc=example,dc=com";
pub const GROUPS_DN: &str = "ou=Groups,dc=example,dc=com";
pub const ROLES_DN: &str = "ou=Roles,dc=example,dc=com";

/// Test environment: a store over an in-memory directory.
pub struct TestEnv {
    /// Handle sharing the store's directory tree.
    pub directory: MemoryDirectory,
    /// Store under test.
    pub store: LdapIdentityStore<MemoryDirectory>,
}

impl TestEnv {
    /// Creates a store over a directory holding only the naming context.
    pub fn new() -> anyhow::Result<Self> {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new("idm_ldap=debug")),
            )
            .with_test_writer()
            .try_init();

        let directory = MemoryDirectory::with_suffix(SUFFIX);
        let store = LdapIdentityStore::with_session(config()?, directory.clone())?;
        Ok(Self { directory, store })
    }

    /// Creates a second store sharing this directory tree.
    pub fn second_store(&self) -> anyhow::Result<LdapIdentityStore<MemoryDirectory>> {
        Ok(LdapIdentityStore::with_session(
            config()?,
            self.directory.clone(),
        )?)
    }

    /// Reads an entry straight from the directory.
    pub fn entry(&self, dn: &str) -> anyhow::Result<DirectoryEntry> {
        self.directory
            .entry(dn)
            .ok_or_else(|| anyhow::anyhow!("no entry at {dn}"))
    }

    /// `member` values of an entry, empty when absent.
    pub fn members(&self, dn: &str) -> anyhow::Result<Vec<String>> {
        Ok(self
            .entry(dn)?
            .get("member")
            .map(<[String]>::to_vec)
            .unwrap_or_default())
    }

    /// Number of rebinds issued since the last reset.
    pub fn rebinds(&self) -> usize {
        self.directory.count(OpKind::Rebind)
    }
}

fn config() -> anyhow::Result<LdapConfig> {
    Ok(LdapConfig::builder()
        .connection_url("ldap://localhost:389")
        .bind_dn(format!("cn=admin,{SUFFIX}"))
        .bind_credential("secret")
        .users_dn(USERS_DN)
        .groups_dn(GROUPS_DN)
        .roles_dn(ROLES_DN)
        .build()?)
}
