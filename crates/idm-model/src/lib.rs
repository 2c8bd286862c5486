//! # idm-model
//!
//! Domain models for the identity store (User, Group, Role, Membership).
//!
//! This crate defines the entities every store backend reads and writes,
//! and the policy that derives user names and identifiers from a full name.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod attribute;
pub mod group;
pub mod link;
pub mod membership;
pub mod name;
pub mod role;
pub mod user;

pub use attribute::{AttributeHolder, Attributes};
pub use group::Group;
pub use link::{IdentityKind, IdentityType, StoreLink};
pub use membership::Membership;
pub use name::{derive_user_id, NameError, PersonName, MAX_USER_ID_LEN};
pub use role::Role;
pub use user::User;
