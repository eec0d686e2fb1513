//! hadoop-security - Kerberos login and ticket renewal for Hadoop-style clusters
//!
//! All logins go through one [`AuthenticationGate`], which owns the
//! process-wide [`IdentityProvider`] and serializes access to it:
//! 1. `login_with_keytab` → principal + keytab
//! 2. `login_simple` → identity already established (ticket cache or OS user)
//! 3. `start_ticket_renewal_thread` → background renewal until `stop()`

pub mod config;
mod error;
mod gate;
pub mod log;
pub mod provider;
mod renewer;
pub mod security;

pub use config::{IdentityConfig, SecurityConfig};
pub use error::SecurityError;
pub use gate::AuthenticationGate;
pub use log::{RenewalLog, TracingRenewalLog};
pub use provider::{
    AuthenticatedIdentity, AuthenticationMethod, IdentityProvider, KinitProvider, ProviderError,
};
pub use renewer::{start_ticket_renewal_thread, RenewalSupervisor};
pub use security::{is_security_enabled, SecurityMode};
