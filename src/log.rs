use std::time::Duration;

use crate::error::SecurityError;
use crate::provider::AuthenticatedIdentity;

/// Sink for renewal task events.
///
/// Supplied by whoever starts the renewal, so each worker decides where its
/// renewal messages go. Only failures must be handled; the rest default to no-ops.
pub trait RenewalLog: Send + Sync {
    fn renewal_started(&self, _id: &str, _identity: &AuthenticatedIdentity, _period: Duration) {}

    fn renewal_attempt(&self, _id: &str, _identity: &AuthenticatedIdentity) {}

    fn renewal_succeeded(&self, _id: &str, _identity: &AuthenticatedIdentity) {}

    fn renewal_failed(&self, id: &str, identity: &AuthenticatedIdentity, error: &SecurityError);

    fn renewal_stopped(&self, _id: &str) {}
}

/// Forwards renewal events to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingRenewalLog;

impl RenewalLog for TracingRenewalLog {
    fn renewal_started(&self, id: &str, identity: &AuthenticatedIdentity, period: Duration) {
        tracing::info!(task = %id, identity = %identity, period = ?period, "Started Kerberos ticket renewal");
    }

    fn renewal_attempt(&self, id: &str, identity: &AuthenticatedIdentity) {
        tracing::debug!(task = %id, identity = %identity, "Invoking renewal attempt for Kerberos ticket");
    }

    fn renewal_succeeded(&self, id: &str, identity: &AuthenticatedIdentity) {
        tracing::debug!(task = %id, identity = %identity, "Kerberos ticket renewal check passed");
    }

    fn renewal_failed(&self, id: &str, identity: &AuthenticatedIdentity, error: &SecurityError) {
        tracing::warn!(task = %id, identity = %identity, error = %error, "Failed to renew Kerberos ticket");
    }

    fn renewal_stopped(&self, id: &str) {
        tracing::info!(task = %id, "Stopped Kerberos ticket renewal");
    }
}
