//! Directory store configuration.
//!
//! Configuration can be built in code with [`LdapConfig::builder`] or
//! loaded from TOML:
//!
//! ```toml
//! connection_url = "ldap://localhost:389"
//! auth_mode = "simple"
//! bind_dn = "cn=admin,dc=example,dc=com"
//! bind_credential = "secret"
//! users_dn = "ou=People,dc=example,dc=com"
//! groups_dn = "ou=Groups,dc=example,dc=com"
//! roles_dn = "ou=Roles,dc=example,dc=com"
//! ```
//!
//! ## Security
//!
//! The bind credential is never serialized.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{LdapError, LdapResult};

/// How the store authenticates to the directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    /// Anonymous access.
    None,
    /// Simple bind with a DN and password.
    #[default]
    Simple,
}

/// Transport security for the directory connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportSecurity {
    /// Plain connection (or TLS implied by an `ldaps://` URL).
    #[default]
    None,
    /// TLS from connection start. Requires an `ldaps://` URL.
    Ldaps,
    /// Upgrade a plain connection with StartTLS.
    StartTls,
}

/// LDAP search scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchScope {
    /// Search only the base DN.
    Base,
    /// Search one level below the base DN.
    #[default]
    OneLevel,
    /// Search the entire subtree.
    Subtree,
}

impl SearchScope {
    /// Converts to ldap3 scope.
    #[must_use]
    pub const fn to_ldap3(&self) -> ldap3::Scope {
        match self {
            Self::Base => ldap3::Scope::Base,
            Self::OneLevel => ldap3::Scope::OneLevel,
            Self::Subtree => ldap3::Scope::Subtree,
        }
    }
}

fn default_validate_certificates() -> bool {
    true
}

fn default_connection_timeout_secs() -> u64 {
    5
}

fn default_user_object_classes() -> Vec<String> {
    to_strings(&["top", "person", "organizationalPerson", "inetOrgPerson"])
}

fn default_group_object_classes() -> Vec<String> {
    to_strings(&["top", "organizationalUnit"])
}

fn default_role_object_classes() -> Vec<String> {
    to_strings(&["top", "groupOfNames"])
}

fn default_container_object_classes() -> Vec<String> {
    to_strings(&["top", "organizationalUnit"])
}

fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(ToString::to_string).collect()
}

/// Directory store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LdapConfig {
    // === Connection ===
    /// LDAP server URL (`ldap://` or `ldaps://`).
    #[serde(default)]
    pub connection_url: String,

    /// Authentication mode.
    #[serde(default)]
    pub auth_mode: AuthMode,

    /// Bind DN for simple authentication.
    #[serde(default)]
    pub bind_dn: Option<String>,

    /// Bind credential (password).
    #[serde(default, skip_serializing)]
    pub bind_credential: Option<String>,

    // === TLS ===
    /// Transport security.
    #[serde(default)]
    pub transport_security: TransportSecurity,

    /// Whether to validate server certificates.
    #[serde(default = "default_validate_certificates")]
    pub validate_certificates: bool,

    /// Connect timeout in seconds.
    #[serde(default = "default_connection_timeout_secs")]
    pub connection_timeout_secs: u64,

    // === Directory Structure ===
    /// Container holding user entries.
    pub users_dn: String,

    /// Container holding group entries.
    pub groups_dn: String,

    /// Container holding role entries.
    pub roles_dn: String,

    /// Object classes of user entries.
    #[serde(default = "default_user_object_classes")]
    pub user_object_classes: Vec<String>,

    /// Object classes of group entries.
    #[serde(default = "default_group_object_classes")]
    pub group_object_classes: Vec<String>,

    /// Object classes of role entries.
    #[serde(default = "default_role_object_classes")]
    pub role_object_classes: Vec<String>,

    /// Object classes of containers created on demand.
    #[serde(default = "default_container_object_classes")]
    pub container_object_classes: Vec<String>,

    // === Search ===
    /// Search scope below each container.
    #[serde(default)]
    pub search_scope: SearchScope,
}

impl LdapConfig {
    /// Creates a new configuration builder.
    #[must_use]
    pub fn builder() -> LdapConfigBuilder {
        LdapConfigBuilder::new()
    }

    /// Parses and validates a TOML document.
    pub fn from_toml_str(input: &str) -> LdapResult<Self> {
        let config: Self = toml::from_str(input)
            .map_err(|e| LdapError::config(format!("invalid configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads and validates a TOML configuration file.
    pub fn load(path: impl AsRef<Path>) -> LdapResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            LdapError::config(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> LdapResult<()> {
        self.validate_url()?;

        if self.auth_mode == AuthMode::Simple
            && self.bind_dn.as_deref().map_or(true, str::is_empty)
        {
            return Err(LdapError::config(
                "bind_dn is required for simple authentication",
            ));
        }

        for (field, dn) in [
            ("users_dn", &self.users_dn),
            ("groups_dn", &self.groups_dn),
            ("roles_dn", &self.roles_dn),
        ] {
            if dn.trim().is_empty() {
                return Err(LdapError::config(format!("{field} cannot be empty")));
            }
        }

        for (field, classes) in [
            ("user_object_classes", &self.user_object_classes),
            ("group_object_classes", &self.group_object_classes),
            ("role_object_classes", &self.role_object_classes),
            ("container_object_classes", &self.container_object_classes),
        ] {
            if classes.is_empty() {
                return Err(LdapError::config(format!("{field} cannot be empty")));
            }
        }

        Ok(())
    }

    fn validate_url(&self) -> LdapResult<()> {
        if self.connection_url.trim().is_empty() {
            return Err(LdapError::config("connection_url is required"));
        }

        let url_lower = self.connection_url.to_lowercase();
        let (secure, host) = if let Some(host) = url_lower.strip_prefix("ldaps://") {
            (true, host)
        } else if let Some(host) = url_lower.strip_prefix("ldap://") {
            (false, host)
        } else {
            return Err(LdapError::config(
                "connection_url must start with ldap:// or ldaps://",
            ));
        };

        if host.is_empty() {
            return Err(LdapError::config("connection_url is missing a host"));
        }

        match self.transport_security {
            TransportSecurity::StartTls if secure => Err(LdapError::config(
                "start_tls cannot be combined with an ldaps:// URL",
            )),
            TransportSecurity::Ldaps if !secure => Err(LdapError::config(
                "ldaps transport security requires an ldaps:// URL",
            )),
            _ => Ok(()),
        }
    }

    /// Connect timeout.
    #[must_use]
    pub const fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_timeout_secs)
    }
}

// ============================================================================
// Configuration Builder
// ============================================================================

/// Builder for [`LdapConfig`].
#[derive(Debug)]
pub struct LdapConfigBuilder {
    connection_url: Option<String>,
    auth_mode: AuthMode,
    bind_dn: Option<String>,
    bind_credential: Option<String>,
    transport_security: TransportSecurity,
    validate_certificates: bool,
    connection_timeout: Duration,
    users_dn: Option<String>,
    groups_dn: Option<String>,
    roles_dn: Option<String>,
    user_object_classes: Vec<String>,
    group_object_classes: Vec<String>,
    role_object_classes: Vec<String>,
    container_object_classes: Vec<String>,
    search_scope: SearchScope,
}

impl Default for LdapConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl LdapConfigBuilder {
    /// Creates a new builder with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self {
            connection_url: None,
            auth_mode: AuthMode::default(),
            bind_dn: None,
            bind_credential: None,
            transport_security: TransportSecurity::default(),
            validate_certificates: default_validate_certificates(),
            connection_timeout: Duration::from_secs(default_connection_timeout_secs()),
            users_dn: None,
            groups_dn: None,
            roles_dn: None,
            user_object_classes: default_user_object_classes(),
            group_object_classes: default_group_object_classes(),
            role_object_classes: default_role_object_classes(),
            container_object_classes: default_container_object_classes(),
            search_scope: SearchScope::default(),
        }
    }

    /// Sets the connection URL.
    #[must_use]
    pub fn connection_url(mut self, url: impl Into<String>) -> Self {
        self.connection_url = Some(url.into());
        self
    }

    /// Sets the authentication mode.
    #[must_use]
    pub const fn auth_mode(mut self, mode: AuthMode) -> Self {
        self.auth_mode = mode;
        self
    }

    /// Sets the bind DN.
    #[must_use]
    pub fn bind_dn(mut self, dn: impl Into<String>) -> Self {
        self.bind_dn = Some(dn.into());
        self
    }

    /// Sets the bind credential (password).
    #[must_use]
    pub fn bind_credential(mut self, credential: impl Into<String>) -> Self {
        self.bind_credential = Some(credential.into());
        self
    }

    /// Sets the transport security.
    #[must_use]
    pub const fn transport_security(mut self, security: TransportSecurity) -> Self {
        self.transport_security = security;
        self
    }

    /// Sets whether to validate certificates.
    #[must_use]
    pub const fn validate_certificates(mut self, validate: bool) -> Self {
        self.validate_certificates = validate;
        self
    }

    /// Sets the connect timeout.
    #[must_use]
    pub const fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    /// Sets the users container DN.
    #[must_use]
    pub fn users_dn(mut self, dn: impl Into<String>) -> Self {
        self.users_dn = Some(dn.into());
        self
    }

    /// Sets the groups container DN.
    #[must_use]
    pub fn groups_dn(mut self, dn: impl Into<String>) -> Self {
        self.groups_dn = Some(dn.into());
        self
    }

    /// Sets the roles container DN.
    #[must_use]
    pub fn roles_dn(mut self, dn: impl Into<String>) -> Self {
        self.roles_dn = Some(dn.into());
        self
    }

    /// Sets the group object classes.
    #[must_use]
    pub fn group_object_classes(mut self, classes: Vec<String>) -> Self {
        self.group_object_classes = classes;
        self
    }

    /// Sets the role object classes.
    #[must_use]
    pub fn role_object_classes(mut self, classes: Vec<String>) -> Self {
        self.role_object_classes = classes;
        self
    }

    /// Sets the search scope.
    #[must_use]
    pub const fn search_scope(mut self, scope: SearchScope) -> Self {
        self.search_scope = scope;
        self
    }

    /// Builds and validates the configuration.
    ///
    /// ## Errors
    ///
    /// Returns an error if required fields are missing or inconsistent.
    pub fn build(self) -> LdapResult<LdapConfig> {
        let config = LdapConfig {
            connection_url: self
                .connection_url
                .ok_or_else(|| LdapError::config("connection_url is required"))?,
            auth_mode: self.auth_mode,
            bind_dn: self.bind_dn,
            bind_credential: self.bind_credential,
            transport_security: self.transport_security,
            validate_certificates: self.validate_certificates,
            connection_timeout_secs: self.connection_timeout.as_secs(),
            users_dn: self
                .users_dn
                .ok_or_else(|| LdapError::config("users_dn is required"))?,
            groups_dn: self
                .groups_dn
                .ok_or_else(|| LdapError::config("groups_dn is required"))?,
            roles_dn: self
                .roles_dn
                .ok_or_else(|| LdapError::config("roles_dn is required"))?,
            user_object_classes: self.user_object_classes,
            group_object_classes: self.group_object_classes,
            role_object_classes: self.role_object_classes,
            container_object_classes: self.container_object_classes,
            search_scope: self.search_scope,
        };

        config.validate()?;

        Ok(config)
    }
}
