use std::collections::HashMap;
use std::ffi::OsStr;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::process::Command;

use super::{AuthenticatedIdentity, AuthenticationMethod, IdentityProvider, ProviderError};
use crate::config::{
    SecurityConfig, KERBEROS_MIN_SECONDS_BEFORE_RELOGIN, KERBEROS_TICKET_CACHE_PATH,
};
use crate::security::SecurityMode;

const DEFAULT_KINIT: &str = "kinit";
const DEFAULT_KLIST: &str = "klist";
const DEFAULT_MIN_SECONDS_BEFORE_RELOGIN: u64 = 60;

/// Identity provider backed by the MIT/Heimdal command line tools.
///
/// Tickets live in the credential cache named by
/// `hadoop.security.kerberos.ticket.cache.path` (passed as `KRB5CCNAME`).
/// When unset, each keytab principal gets its own cache file under the cache
/// directory, and the login user reads the system default cache.
pub struct KinitProvider {
    kinit: PathBuf,
    klist: PathBuf,
    cache_dir: PathBuf,
    environ: Option<HashMap<String, String>>,
    config: SecurityConfig,
    login_user: Option<AuthenticatedIdentity>,
    /// Last successful kinit per principal
    last_login: HashMap<String, Instant>,
}

impl KinitProvider {
    pub fn new() -> Self {
        Self::with_commands(DEFAULT_KINIT, DEFAULT_KLIST)
    }

    pub fn with_commands(kinit: impl Into<PathBuf>, klist: impl Into<PathBuf>) -> Self {
        Self {
            kinit: kinit.into(),
            klist: klist.into(),
            cache_dir: std::env::temp_dir(),
            environ: None,
            config: SecurityConfig::new(),
            login_user: None,
            last_login: HashMap::new(),
        }
    }

    /// Directory for the per-principal credential caches
    pub fn with_cache_dir(mut self, cache_dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = cache_dir.into();
        self
    }

    /// Use a custom environment for OS user lookup (for testing)
    pub fn with_environ(mut self, environ: HashMap<String, String>) -> Self {
        self.environ = Some(environ);
        self
    }

    fn env_var(&self, key: &str) -> Option<String> {
        let value = match &self.environ {
            Some(environ) => environ.get(key).cloned(),
            None => std::env::var(key).ok(),
        };
        value.filter(|v| !v.trim().is_empty())
    }

    fn ticket_cache(&self) -> Option<PathBuf> {
        self.config
            .get(KERBEROS_TICKET_CACHE_PATH)
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(PathBuf::from)
    }

    /// Configured cache, or a cache file of the principal's own
    fn principal_cache(&self, principal: &str) -> PathBuf {
        self.ticket_cache().unwrap_or_else(|| {
            let name: String = principal
                .chars()
                .map(|c| match c {
                    'a'..='z' | 'A'..='Z' | '0'..='9' | '.' | '-' | '_' => c,
                    _ => '_',
                })
                .collect();
            self.cache_dir.join(format!("krb5cc_{name}"))
        })
    }

    fn min_relogin_interval(&self) -> Duration {
        let seconds = self
            .config
            .get(KERBEROS_MIN_SECONDS_BEFORE_RELOGIN)
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(DEFAULT_MIN_SECONDS_BEFORE_RELOGIN);
        Duration::from_secs(seconds)
    }

    async fn run(
        &self,
        program: &Path,
        args: &[&OsStr],
        ticket_cache: Option<&Path>,
    ) -> Result<Output, ProviderError> {
        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(cache) = ticket_cache {
            command.env("KRB5CCNAME", cache);
        }

        let output = command.output().await?;
        if !output.status.success() {
            let rendered = std::iter::once(program.as_os_str())
                .chain(args.iter().copied())
                .map(|a| a.to_string_lossy())
                .collect::<Vec<_>>()
                .join(" ");
            return Err(ProviderError::CommandFailed {
                command: rendered,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(output)
    }

    async fn kinit_keytab(
        &self,
        principal: &str,
        keytab: &Path,
        ticket_cache: Option<&Path>,
    ) -> Result<(), ProviderError> {
        match tokio::fs::metadata(keytab).await {
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(ProviderError::KeytabNotFound {
                    path: keytab.to_path_buf(),
                })
            }
            Err(e) => return Err(ProviderError::Io(e)),
        }
        let args = [
            OsStr::new("-k"),
            OsStr::new("-t"),
            keytab.as_os_str(),
            OsStr::new(principal),
        ];
        self.run(&self.kinit, &args, ticket_cache).await?;
        Ok(())
    }

    async fn cached_principal(&self) -> Result<String, ProviderError> {
        let cache = self.ticket_cache();
        let output = self.run(&self.klist, &[], cache.as_deref()).await?;
        let listing = String::from_utf8_lossy(&output.stdout);
        parse_default_principal(&listing).ok_or_else(|| {
            ProviderError::NoLoginUser("ticket cache has no default principal".to_string())
        })
    }

    fn os_user(&self) -> Result<String, ProviderError> {
        ["HADOOP_USER_NAME", "USER", "LOGNAME", "USERNAME"]
            .iter()
            .find_map(|key| self.env_var(key))
            .map(|user| user.trim().to_string())
            .ok_or_else(|| {
                ProviderError::NoLoginUser("no OS user name in environment".to_string())
            })
    }
}

impl Default for KinitProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdentityProvider for KinitProvider {
    async fn set_configuration(&mut self, config: &SecurityConfig) -> Result<(), ProviderError> {
        let previous = SecurityMode::from_config(&self.config);
        let next = SecurityMode::from_config(config);
        if previous != next {
            // A login user established under one mode is meaningless under the other.
            self.login_user = None;
        }
        self.config = config.clone();
        Ok(())
    }

    async fn login_from_keytab(
        &mut self,
        principal: &str,
        keytab: &Path,
    ) -> Result<AuthenticatedIdentity, ProviderError> {
        let cache = self.principal_cache(principal);
        self.kinit_keytab(principal, keytab, Some(&cache)).await?;

        let identity = AuthenticatedIdentity::kerberos(
            principal,
            Some(keytab.to_path_buf()),
            Some(cache.clone()),
        );
        self.last_login.insert(principal.to_string(), Instant::now());
        tracing::debug!(identity = %identity, cache = %cache.display(), "kinit from keytab succeeded");
        Ok(identity)
    }

    async fn login_user(&mut self) -> Result<AuthenticatedIdentity, ProviderError> {
        if let Some(user) = &self.login_user {
            return Ok(user.clone());
        }

        let identity = match SecurityMode::from_config(&self.config) {
            SecurityMode::Kerberos => {
                let principal = self.cached_principal().await?;
                AuthenticatedIdentity::kerberos(principal, None, self.ticket_cache())
            }
            SecurityMode::Simple => AuthenticatedIdentity::simple(self.os_user()?),
        };
        self.login_user = Some(identity.clone());
        Ok(identity)
    }

    async fn check_tgt_and_relogin(
        &mut self,
        identity: &AuthenticatedIdentity,
    ) -> Result<(), ProviderError> {
        if identity.method() != AuthenticationMethod::Kerberos {
            tracing::trace!(identity = %identity, "No ticket to renew");
            return Ok(());
        }

        if let Some(last) = self.last_login.get(identity.user_name()) {
            if last.elapsed() < self.min_relogin_interval() {
                tracing::debug!(identity = %identity, "Last login too recent, skipping relogin");
                return Ok(());
            }
        }

        let cache = identity
            .ticket_cache()
            .map(Path::to_path_buf)
            .or_else(|| self.ticket_cache());

        // `klist -s` exits non-zero when the cache holds no valid ticket.
        if self
            .run(&self.klist, &[OsStr::new("-s")], cache.as_deref())
            .await
            .is_ok()
        {
            return Ok(());
        }

        match identity.keytab() {
            Some(keytab) => {
                tracing::info!(identity = %identity, "Ticket expired, logging in again from keytab");
                self.kinit_keytab(identity.user_name(), keytab, cache.as_deref())
                    .await?;
            }
            None => {
                tracing::info!(identity = %identity, "Ticket expired, renewing from cache");
                self.run(&self.kinit, &[OsStr::new("-R")], cache.as_deref())
                    .await?;
            }
        }
        self.last_login
            .insert(identity.user_name().to_string(), Instant::now());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "kinit"
    }
}

/// Extract the default principal from `klist` output (MIT or Heimdal format)
fn parse_default_principal(listing: &str) -> Option<String> {
    listing.lines().find_map(|line| {
        let line = line.trim();
        line.strip_prefix("Default principal:")
            .or_else(|| line.strip_prefix("Principal:"))
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
    })
}
