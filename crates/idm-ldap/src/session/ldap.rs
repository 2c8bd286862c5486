//! ldap3-backed directory session.

use std::collections::HashSet;

use async_trait::async_trait;
use ldap3::{Ldap, LdapConnAsync, LdapConnSettings, Mod, Scope, SearchEntry, SearchResult};
use tracing::{debug, info, instrument, warn};

use crate::config::{AuthMode, LdapConfig, TransportSecurity};
use crate::entry::{DirectoryEntry, EqualityFilter};
use crate::error::{LdapError, LdapResult, RC_NO_SUCH_OBJECT};
use crate::schema::OBJECT_CLASS;

use super::DirectorySession;

/// A session over one ldap3 connection.
///
/// The connection is driven on a spawned tokio task. `Ldap` handles are
/// cheap clones of the same connection, so each operation clones one.
#[derive(Clone)]
pub struct LdapSession {
    ldap: Ldap,
    scope: Scope,
}

impl std::fmt::Debug for LdapSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LdapSession")
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

impl LdapSession {
    /// Connects and authenticates according to the configuration.
    #[instrument(skip(config), fields(url = %config.connection_url))]
    pub async fn connect(config: &LdapConfig) -> LdapResult<Self> {
        config.validate()?;

        let settings = LdapConnSettings::new()
            .set_conn_timeout(config.connection_timeout())
            .set_starttls(config.transport_security == TransportSecurity::StartTls)
            .set_no_tls_verify(!config.validate_certificates);

        let (conn, mut ldap) = LdapConnAsync::with_settings(settings, &config.connection_url)
            .await
            .map_err(|e| LdapError::connection(e.to_string()))?;

        tokio::spawn(async move {
            if let Err(e) = conn.drive().await {
                warn!(error = %e, "LDAP connection driver error");
            }
        });

        if config.auth_mode == AuthMode::Simple {
            let bind_dn = config.bind_dn.as_deref().unwrap_or_default();
            let credential = config.bind_credential.as_deref().unwrap_or_default();

            debug!(bind_dn = %bind_dn, "Performing LDAP bind");

            let result = ldap
                .simple_bind(bind_dn, credential)
                .await
                .map_err(|e| LdapError::Bind(e.to_string()))?;
            if result.rc != 0 {
                return Err(LdapError::Bind(format!(
                    "result code {}: {}",
                    result.rc, result.text
                )));
            }
        }

        info!("LDAP connection established");

        Ok(Self {
            ldap,
            scope: config.search_scope.to_ldap3(),
        })
    }

    /// Unbinds and closes the connection.
    pub async fn close(&self) -> LdapResult<()> {
        self.ldap.clone().unbind().await?;
        Ok(())
    }
}

fn check(result: ldap3::LdapResult, dn: &str) -> LdapResult<()> {
    if result.rc == 0 {
        Ok(())
    } else {
        Err(LdapError::from_result_code(result.rc, dn, result.text))
    }
}

fn value_set(values: &[String]) -> HashSet<String> {
    values.iter().cloned().collect()
}

#[async_trait]
impl DirectorySession for LdapSession {
    async fn bind(&self, entry: &DirectoryEntry) -> LdapResult<()> {
        debug!(dn = %entry.dn, "Adding LDAP entry");

        let attrs = entry.to_ldap3_attrs();
        let attrs: Vec<(&str, HashSet<&str>)> = attrs
            .iter()
            .map(|(name, values)| (name.as_str(), values.iter().map(String::as_str).collect()))
            .collect();

        let result = self.ldap.clone().add(&entry.dn, attrs).await?;
        check(result, &entry.dn)
    }

    async fn rebind(&self, entry: &DirectoryEntry) -> LdapResult<()> {
        match self.lookup(&entry.dn).await? {
            Some(existing) => self.replace(&existing, entry).await,
            None => self.bind(entry).await,
        }
    }

    async fn replace(&self, existing: &DirectoryEntry, entry: &DirectoryEntry) -> LdapResult<()> {
        debug!(dn = %entry.dn, "Replacing LDAP entry");

        let mut mods: Vec<Mod<String>> = Vec::new();
        if !entry.object_classes.is_empty() {
            mods.push(Mod::Replace(
                OBJECT_CLASS.to_string(),
                value_set(&entry.object_classes),
            ));
        }
        for (name, values) in entry.attributes() {
            mods.push(Mod::Replace(name.to_string(), value_set(values)));
        }
        for (name, _) in existing.attributes() {
            if !entry.has_attr(name) {
                mods.push(Mod::Replace(name.to_string(), HashSet::new()));
            }
        }

        let result = self.ldap.clone().modify(&entry.dn, mods).await?;
        check(result, &entry.dn)
    }

    async fn destroy(&self, dn: &str) -> LdapResult<()> {
        debug!(dn = %dn, "Deleting LDAP entry");

        let result = self.ldap.clone().delete(dn).await?;
        check(result, dn)
    }

    async fn search(
        &self,
        base_dn: &str,
        filter: &EqualityFilter,
        attributes: &[&str],
    ) -> LdapResult<Vec<DirectoryEntry>> {
        let filter = filter.to_filter_string();
        let attrs: Vec<&str> = if attributes.is_empty() {
            vec!["*"]
        } else {
            attributes.to_vec()
        };

        debug!(base_dn = %base_dn, filter = %filter, "Searching LDAP");

        let SearchResult(entries, result) = self
            .ldap
            .clone()
            .search(base_dn, self.scope, &filter, attrs)
            .await?;
        check(result, base_dn)?;

        Ok(entries
            .into_iter()
            .map(SearchEntry::construct)
            .map(DirectoryEntry::from_search_entry)
            .collect())
    }

    async fn lookup(&self, dn: &str) -> LdapResult<Option<DirectoryEntry>> {
        let SearchResult(entries, result) = self
            .ldap
            .clone()
            .search(dn, Scope::Base, "(objectClass=*)", vec!["*"])
            .await?;

        if result.rc == RC_NO_SUCH_OBJECT {
            return Ok(None);
        }
        check(result, dn)?;

        Ok(entries
            .into_iter()
            .next()
            .map(SearchEntry::construct)
            .map(DirectoryEntry::from_search_entry))
    }
}
