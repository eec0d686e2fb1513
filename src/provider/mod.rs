mod identity;
mod kinit;

pub use identity::{AuthenticatedIdentity, AuthenticationMethod};
pub use kinit::KinitProvider;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;

use crate::config::SecurityConfig;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Keytab not found: {}", .path.display())]
    KeytabNotFound { path: PathBuf },

    #[error("`{command}` exited with {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("No login user available: {0}")]
    NoLoginUser(String),

    #[error("Credentials rejected: {0}")]
    Rejected(String),
}

/// The process-wide identity subsystem.
///
/// Implementations hold global login state, so they are only ever driven
/// through [`AuthenticationGate`](crate::AuthenticationGate), which owns the
/// single instance and serializes every call.
#[async_trait]
pub trait IdentityProvider: Send {
    /// Replace the active security configuration
    async fn set_configuration(&mut self, config: &SecurityConfig) -> Result<(), ProviderError>;

    /// Acquire a ticket for `principal` from `keytab`; the login user is unchanged
    async fn login_from_keytab(
        &mut self,
        principal: &str,
        keytab: &Path,
    ) -> Result<AuthenticatedIdentity, ProviderError>;

    /// The identity already established for this process (ticket cache or OS user)
    async fn login_user(&mut self) -> Result<AuthenticatedIdentity, ProviderError>;

    /// Re-login if the identity's ticket is missing or expired
    async fn check_tgt_and_relogin(
        &mut self,
        identity: &AuthenticatedIdentity,
    ) -> Result<(), ProviderError>;

    /// Provider name for logging
    fn name(&self) -> &'static str;
}
