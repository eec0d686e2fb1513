use std::sync::Arc;
use std::time::Duration;

use lazy_static::lazy_static;
use tokio::sync::{Mutex, MutexGuard};

use crate::config::IdentityConfig;
use crate::error::SecurityError;
use crate::log::RenewalLog;
use crate::provider::{AuthenticatedIdentity, IdentityProvider, ProviderError};
use crate::renewer::{self, RenewalSupervisor};
use crate::security;

const LOGIN_USER: &str = "<login user>";

lazy_static! {
    /// Held by every login and renewal of every gate in the process
    static ref PROCESS_LOGIN_LOCK: Mutex<()> = Mutex::new(());
}

/// Single point of access to the process-wide identity provider.
///
/// Every login and renewal holds one process-wide lock for its whole duration,
/// so a configuration applied by one caller is never interleaved with another
/// caller's login, even when the callers hold different gates. Clones share the
/// provider.
#[derive(Clone)]
pub struct AuthenticationGate {
    provider: Arc<Mutex<Box<dyn IdentityProvider>>>,
}

impl AuthenticationGate {
    pub fn new<P>(provider: P) -> Self
    where
        P: IdentityProvider + 'static,
    {
        Self {
            provider: Arc::new(Mutex::new(Box::new(provider))),
        }
    }

    /// Apply the security configuration and log in from the configured keytab.
    ///
    /// Missing principal or keytab is rejected before the provider is touched.
    pub async fn login_with_keytab(
        &self,
        config: &IdentityConfig,
    ) -> Result<AuthenticatedIdentity, SecurityError> {
        let (principal, keytab) = config.keytab_credentials()?;

        let (_serialized, mut provider) = self.lock().await;
        provider
            .set_configuration(config.security_config())
            .await
            .map_err(|source| auth_failure("configuration", &principal, source))?;
        let identity = provider
            .login_from_keytab(&principal, &keytab)
            .await
            .map_err(|source| auth_failure("keytab login", &principal, source))?;

        tracing::info!(
            provider = provider.name(),
            identity = %identity,
            keytab = %keytab.display(),
            at = %identity.logged_in_at(),
            "Logged in from keytab"
        );
        Ok(identity)
    }

    /// Apply the security configuration and return the current login user
    pub async fn login_simple(
        &self,
        config: &IdentityConfig,
    ) -> Result<AuthenticatedIdentity, SecurityError> {
        let principal = config.principal().unwrap_or(LOGIN_USER);

        let (_serialized, mut provider) = self.lock().await;
        provider
            .set_configuration(config.security_config())
            .await
            .map_err(|source| auth_failure("configuration", principal, source))?;
        let identity = provider
            .login_user()
            .await
            .map_err(|source| auth_failure("login", principal, source))?;

        tracing::info!(provider = provider.name(), identity = %identity, "Using login user");
        Ok(identity)
    }

    /// Reads only `config`; does not wait for the gate
    pub fn is_security_enabled(config: &IdentityConfig) -> bool {
        security::is_security_enabled(config.security_config())
    }

    pub(crate) async fn renew(&self, identity: &AuthenticatedIdentity) -> Result<(), SecurityError> {
        let (_serialized, mut provider) = self.lock().await;
        provider
            .check_tgt_and_relogin(identity)
            .await
            .map_err(|source| auth_failure("ticket renewal", identity.user_name(), source))
    }

    /// Process lock first, provider second, always in that order
    async fn lock(
        &self,
    ) -> (
        MutexGuard<'static, ()>,
        MutexGuard<'_, Box<dyn IdentityProvider>>,
    ) {
        let serialized = PROCESS_LOGIN_LOCK.lock().await;
        let provider = self.provider.lock().await;
        (serialized, provider)
    }

    /// Keep `identity` fresh in the background; see [`renewer::start_ticket_renewal_thread`]
    pub fn start_ticket_renewal_thread(
        &self,
        id: impl Into<String>,
        identity: AuthenticatedIdentity,
        period: Duration,
        log: Arc<dyn RenewalLog>,
    ) -> Result<RenewalSupervisor, SecurityError> {
        renewer::start_ticket_renewal_thread(self.clone(), id, identity, period, log)
    }
}

fn auth_failure(action: &'static str, principal: &str, source: ProviderError) -> SecurityError {
    SecurityError::AuthenticationFailure {
        action,
        principal: principal.to_string(),
        source,
    }
}
