use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;

use crate::error::SecurityError;
use crate::security;

/// Prefix of environment variables that carry Hadoop configuration keys
const ENV_PREFIX: &str = "HADOOP_";

pub const KERBEROS_TICKET_CACHE_PATH: &str = "hadoop.security.kerberos.ticket.cache.path";
pub const KERBEROS_MIN_SECONDS_BEFORE_RELOGIN: &str = "hadoop.kerberos.min.seconds.before.relogin";

/// Hadoop-style security configuration: plain string keys and values.
///
/// Deserializes from a flat object; numbers and booleans keep their text form
/// and `null` entries are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "HashMap<String, Value>")]
pub struct SecurityConfig {
    values: HashMap<String, String>,
}

impl SecurityConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a custom environment (for testing)
    ///
    /// `HADOOP_SECURITY_AUTHENTICATION=kerberos` becomes
    /// `hadoop.security.authentication=kerberos`. Other variables are ignored.
    pub fn from_environ(environ: HashMap<String, String>) -> Self {
        environ
            .into_iter()
            .filter(|(key, _)| key.starts_with(ENV_PREFIX))
            .map(|(key, value)| (key.to_lowercase().replace('_', "."), value))
            .collect()
    }

    /// Build from the actual OS environment
    pub fn from_env() -> Self {
        Self::from_environ(std::env::vars().collect())
    }

    /// Load a JSON object of settings. Numbers and booleans are kept as their text form.
    pub async fn load_file(path: impl AsRef<Path>) -> Result<Self, SecurityError> {
        let path = path.as_ref();
        tracing::debug!("Load security configuration from file {:?} ...", path);
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| SecurityError::ConfigRead {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_json(&contents)
    }

    pub fn from_json(contents: &str) -> Result<Self, SecurityError> {
        Ok(serde_json::from_str(contents)?)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    /// Values of `other` win over values already present
    pub fn merge(mut self, other: SecurityConfig) -> Self {
        self.values.extend(other.values);
        self
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for SecurityConfig {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl From<HashMap<String, Value>> for SecurityConfig {
    fn from(raw: HashMap<String, Value>) -> Self {
        raw.into_iter()
            .filter_map(|(key, value)| match value {
                Value::String(s) => Some((key, s)),
                Value::Null => None,
                other => Some((key, other.to_string())),
            })
            .collect()
    }
}

/// How a worker authenticates: cluster configuration plus optional keytab credentials
#[derive(Debug, Clone, Default)]
pub struct IdentityConfig {
    security_config: SecurityConfig,
    principal: Option<String>,
    keytab_path: Option<String>,
}

impl IdentityConfig {
    pub fn new(security_config: SecurityConfig) -> Self {
        Self {
            security_config,
            principal: None,
            keytab_path: None,
        }
    }

    pub fn with_principal(mut self, principal: impl Into<String>) -> Self {
        self.principal = Some(principal.into());
        self
    }

    pub fn with_keytab(mut self, keytab_path: impl Into<String>) -> Self {
        self.keytab_path = Some(keytab_path.into());
        self
    }

    pub fn security_config(&self) -> &SecurityConfig {
        &self.security_config
    }

    pub fn principal(&self) -> Option<&str> {
        self.principal.as_deref().map(str::trim)
    }

    pub fn keytab_path(&self) -> Option<PathBuf> {
        self.keytab_path.as_deref().map(|p| PathBuf::from(p.trim()))
    }

    pub fn is_security_enabled(&self) -> bool {
        security::is_security_enabled(&self.security_config)
    }

    /// Trimmed principal and keytab, both required for a keytab login
    pub(crate) fn keytab_credentials(&self) -> Result<(String, PathBuf), SecurityError> {
        let principal = self
            .principal()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| SecurityError::invalid("principal is required for keytab login"))?;
        let keytab = self
            .keytab_path
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| SecurityError::invalid("keytab path is required for keytab login"))?;

        Ok((principal.to_string(), PathBuf::from(keytab)))
    }
}
