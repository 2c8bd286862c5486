//! # idm-ldap
//!
//! Directory (LDAP) backed identity store.
//!
//! Users, groups and roles are stored as directory entries below three
//! configured subtrees. Relationships are kept in `member` attributes on
//! the owning side only (a group lists its children and roles, a role
//! lists its users); parents are found by reverse search.
//!
//! - [`LdapIdentityStore`] - the [`idm_store::IdentityStore`] implementation
//! - [`DirectorySession`] - the directory operations the store issues, with
//!   an ldap3 implementation ([`LdapSession`]) and an in-memory tree
//!   ([`MemoryDirectory`])
//! - [`DirectoryMapper`] - entity to entry conversion and DN naming
//! - [`RelationshipResolver`] - parent resolution and referential cleanup
//! - [`BoundEntity`] - handles that batch mutations into one write-back
//!
//! ## Example
//!
//! ```no_run
//! use idm_ldap::{LdapConfig, LdapIdentityStore};
//! use idm_store::IdentityStore;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = LdapConfig::builder()
//!     .connection_url("ldap://localhost:389")
//!     .bind_dn("cn=admin,dc=example,dc=com")
//!     .bind_credential("secret")
//!     .users_dn("ou=People,dc=example,dc=com")
//!     .groups_dn("ou=Groups,dc=example,dc=com")
//!     .roles_dn("ou=Roles,dc=example,dc=com")
//!     .build()?;
//!
//! let store = LdapIdentityStore::connect(config).await?;
//! let user = store.create_user("Anil Saldhana").await?;
//! assert_eq!(user.id, "ASaldha");
//! store.close().await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod entry;
pub mod error;
pub mod mapper;
pub mod notify;
pub mod resolver;
pub mod schema;
pub mod session;
pub mod store;

pub use config::{AuthMode, LdapConfig, LdapConfigBuilder, SearchScope, TransportSecurity};
pub use entry::{DirectoryEntry, EqualityFilter};
pub use error::{LdapError, LdapResult};
pub use mapper::{DirectoryMapper, MemberRef};
pub use notify::{
    BoundEntity, ChangeHandler, ChangeNotification, DirectoryBacked, EntityRef, EntityState,
};
pub use resolver::RelationshipResolver;
pub use session::{DirectoryOp, DirectorySession, LdapSession, MemoryDirectory, OpKind};
pub use store::LdapIdentityStore;
