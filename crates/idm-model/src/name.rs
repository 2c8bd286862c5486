//! Person-name policy.
//!
//! Users are created from a single free-text full name. The first and last
//! names and the short user identifier are derived from it here, so the
//! policy is explicit and testable instead of being buried in string
//! splitting at the call sites.
//!
//! ## Policy
//!
//! - Tokens are separated by runs of whitespace.
//! - Two tokens: first name, last name.
//! - Three tokens: first name, middle name, last name.
//! - Fewer than two or more than three tokens are rejected.
//!
//! The user identifier is the first letter of the first name followed by
//! the last name, truncated to [`MAX_USER_ID_LEN`] characters.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum length of a derived user identifier, in characters.
pub const MAX_USER_ID_LEN: usize = 7;

/// Errors raised when a full name is outside the splitting policy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NameError {
    /// The name has no first/last pair.
    #[error("full name '{0}' must contain at least a first and a last name")]
    TooFewTokens(String),

    /// The name has more tokens than the policy can assign unambiguously.
    #[error("full name '{name}' has {count} parts; at most three are supported")]
    TooManyTokens {
        /// The rejected full name.
        name: String,
        /// Number of whitespace-separated parts.
        count: usize,
    },
}

/// A full name split into its parts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonName {
    /// First name (first token).
    pub first: String,
    /// Middle name, present for three-part names.
    pub middle: Option<String>,
    /// Last name (last token).
    pub last: String,
}

impl PersonName {
    /// Splits a full name according to the policy.
    pub fn parse(full_name: &str) -> Result<Self, NameError> {
        let tokens: Vec<&str> = full_name.split_whitespace().collect();

        match tokens.as_slice() {
            [first, last] => Ok(Self {
                first: (*first).to_string(),
                middle: None,
                last: (*last).to_string(),
            }),
            [first, middle, last] => Ok(Self {
                first: (*first).to_string(),
                middle: Some((*middle).to_string()),
                last: (*last).to_string(),
            }),
            [] | [_] => Err(NameError::TooFewTokens(full_name.to_string())),
            _ => Err(NameError::TooManyTokens {
                name: full_name.to_string(),
                count: tokens.len(),
            }),
        }
    }

    /// Returns the derived short user identifier.
    #[must_use]
    pub fn user_id(&self) -> String {
        derive_user_id(&self.first, &self.last)
    }
}

/// Derives the short user identifier from a first and last name.
///
/// The result is `first initial + last name`, cut to at most
/// [`MAX_USER_ID_LEN`] characters.
#[must_use]
pub fn derive_user_id(first_name: &str, last_name: &str) -> String {
    first_name
        .chars()
        .take(1)
        .chain(last_name.chars())
        .take(MAX_USER_ID_LEN)
        .collect()
}
