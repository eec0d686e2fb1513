use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::error::SecurityError;
use crate::gate::AuthenticationGate;
use crate::log::RenewalLog;
use crate::provider::AuthenticatedIdentity;

struct RenewalState {
    running: AtomicBool,
    cancel: CancellationToken,
}

/// Start a task that periodically asks the provider to renew `identity`'s ticket.
///
/// The task first waits `period`, then renews through `gate`, and repeats until
/// [`RenewalSupervisor::stop`] is called. Renewal errors (and provider panics)
/// go to `log` and never end the loop. Must be called from within a tokio runtime.
pub fn start_ticket_renewal_thread(
    gate: AuthenticationGate,
    id: impl Into<String>,
    identity: AuthenticatedIdentity,
    period: Duration,
    log: Arc<dyn RenewalLog>,
) -> Result<RenewalSupervisor, SecurityError> {
    let id = id.into();
    if period.is_zero() {
        return Err(SecurityError::invalid(format!(
            "renewal period for [{id}] must be greater than zero"
        )));
    }

    let runtime = Handle::try_current().map_err(|e| SecurityError::SchedulingFailure {
        id: id.clone(),
        reason: e.to_string(),
    })?;

    let state = Arc::new(RenewalState {
        running: AtomicBool::new(true),
        cancel: CancellationToken::new(),
    });
    let renewer = TicketRenewer {
        id: id.clone(),
        identity,
        period,
        gate,
        log,
        state: Arc::clone(&state),
    };

    let span = tracing::info_span!("kerberos_ticket_renewal", task = %id);
    let handle = runtime.spawn(renewer.run().instrument(span));

    Ok(RenewalSupervisor {
        id,
        period,
        state,
        handle,
    })
}

struct TicketRenewer {
    id: String,
    identity: AuthenticatedIdentity,
    period: Duration,
    gate: AuthenticationGate,
    log: Arc<dyn RenewalLog>,
    state: Arc<RenewalState>,
}

impl TicketRenewer {
    async fn run(self) {
        self.log.renewal_started(&self.id, &self.identity, self.period);

        loop {
            tokio::select! {
                biased;
                _ = self.state.cancel.cancelled() => break,
                _ = tokio::time::sleep(self.period) => {}
            }
            if !self.state.running.load(Ordering::SeqCst) {
                break;
            }
            self.renew_once().await;
        }

        self.state.running.store(false, Ordering::SeqCst);
        self.log.renewal_stopped(&self.id);
    }

    async fn renew_once(&self) {
        self.log.renewal_attempt(&self.id, &self.identity);

        let result = AssertUnwindSafe(self.gate.renew(&self.identity))
            .catch_unwind()
            .await;
        match result {
            Ok(Ok(())) => self.log.renewal_succeeded(&self.id, &self.identity),
            Ok(Err(e)) => self.log.renewal_failed(&self.id, &self.identity, &e),
            Err(panic) => {
                let e = SecurityError::ProviderPanicked {
                    action: "ticket renewal",
                    message: panic_message(panic.as_ref()),
                };
                self.log.renewal_failed(&self.id, &self.identity, &e);
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Handle to a running renewal task. Dropping it leaves the task running.
pub struct RenewalSupervisor {
    id: String,
    period: Duration,
    state: Arc<RenewalState>,
    handle: JoinHandle<()>,
}

impl RenewalSupervisor {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Ask the loop to exit. Safe to call repeatedly and from any thread.
    ///
    /// A renewal already in progress is allowed to finish; no new one starts.
    pub fn stop(&self) {
        if self.state.running.swap(false, Ordering::SeqCst) {
            tracing::debug!(task = %self.id, "Stopping Kerberos ticket renewal");
        }
        self.state.cancel.cancel();
    }

    pub fn is_running(&self) -> bool {
        self.state.running.load(Ordering::SeqCst) && !self.handle.is_finished()
    }

    /// Stop and wait until the loop has exited
    pub async fn shutdown(self) {
        self.stop();
        if let Err(e) = self.handle.await {
            tracing::error!(task = %self.id, error = %e, "Ticket renewal task ended abnormally");
        }
    }
}

impl fmt::Debug for RenewalSupervisor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenewalSupervisor")
            .field("id", &self.id)
            .field("period", &self.period)
            .field("running", &self.is_running())
            .finish()
    }
}
