//! End-to-End Integration Tests
//!
//! These tests drive the directory identity store through its public
//! contract against an in-memory directory tree.

mod common;
mod attributes;
mod groups;
mod lookups;
mod memberships;
mod users;
