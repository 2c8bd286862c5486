//! # idm-store
//!
//! Storage abstraction for identity management.
//!
//! This crate defines the uniform store contract that concrete backends
//! (directory, relational) implement:
//!
//! - [`IdentityStore`] - CRUD, membership, query and attribute operations
//! - [`StoreError`] - the error taxonomy shared by all backends
//! - [`query`] - query descriptors and result ranges

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod query;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use query::{GroupQuery, MembershipQuery, Range, RoleQuery, UserQuery};
pub use store::IdentityStore;
