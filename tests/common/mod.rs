// tests/common/mod.rs
#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use hadoop_security::{
    AuthenticatedIdentity, IdentityProvider, ProviderError, RenewalLog, SecurityConfig,
    SecurityError,
};
use lazy_static::lazy_static;
use tokio::sync::MutexGuard;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenewalBehavior {
    Succeed,
    Fail,
    Panic,
    /// Succeed after holding the gate for the given time
    Slow(Duration),
}

/// What the provider saw, shared with the test
#[derive(Default)]
pub struct ProviderRecord {
    pub config: HashMap<String, String>,
    pub configurations_applied: usize,
    pub keytab_logins: Vec<(String, PathBuf)>,
    /// Configuration visible at the moment of each login, keyed by principal
    pub observed: Vec<(String, HashMap<String, String>)>,
    pub renewals_started: HashMap<String, usize>,
    pub renewals_finished: HashMap<String, usize>,
    pub in_flight: usize,
    pub max_in_flight: usize,
}

impl ProviderRecord {
    pub fn renewals(&self, user: &str) -> usize {
        self.renewals_started.get(user).copied().unwrap_or(0)
    }
}

/// In-memory stand-in for the process-wide identity subsystem.
///
/// Applies configuration one key at a time with yields in between, so any
/// unserialized access would show up as a mixed configuration.
pub struct MockProvider {
    record: Arc<Mutex<ProviderRecord>>,
    renewal: RenewalBehavior,
    login_user: String,
    fail_logins: bool,
}

impl MockProvider {
    pub fn new(renewal: RenewalBehavior) -> (Self, Arc<Mutex<ProviderRecord>>) {
        let record = Arc::new(Mutex::new(ProviderRecord::default()));
        (Self::sharing(&record, renewal), record)
    }

    /// A second provider instance writing to the same underlying state
    pub fn sharing(record: &Arc<Mutex<ProviderRecord>>, renewal: RenewalBehavior) -> Self {
        Self {
            record: Arc::clone(record),
            renewal,
            login_user: "hdfs".to_string(),
            fail_logins: false,
        }
    }

    pub fn failing_logins(mut self) -> Self {
        self.fail_logins = true;
        self
    }

    fn enter(&self) {
        let mut record = self.record.lock().unwrap();
        record.in_flight += 1;
        record.max_in_flight = record.max_in_flight.max(record.in_flight);
    }

    fn leave(&self) {
        self.record.lock().unwrap().in_flight -= 1;
    }
}

#[async_trait]
impl IdentityProvider for MockProvider {
    async fn set_configuration(&mut self, config: &SecurityConfig) -> Result<(), ProviderError> {
        self.enter();
        {
            let mut record = self.record.lock().unwrap();
            record.config.clear();
            record.configurations_applied += 1;
        }
        for (key, value) in config.iter() {
            tokio::task::yield_now().await;
            self.record
                .lock()
                .unwrap()
                .config
                .insert(key.to_string(), value.to_string());
        }
        Ok(())
    }

    async fn login_from_keytab(
        &mut self,
        principal: &str,
        keytab: &Path,
    ) -> Result<AuthenticatedIdentity, ProviderError> {
        tokio::task::yield_now().await;
        let result = {
            let mut record = self.record.lock().unwrap();
            let snapshot = record.config.clone();
            record.observed.push((principal.to_string(), snapshot));
            record
                .keytab_logins
                .push((principal.to_string(), keytab.to_path_buf()));
            if self.fail_logins {
                Err(ProviderError::Rejected("bad keytab".to_string()))
            } else {
                Ok(AuthenticatedIdentity::kerberos(
                    principal,
                    Some(keytab.to_path_buf()),
                    None,
                ))
            }
        };
        self.leave();
        result
    }

    async fn login_user(&mut self) -> Result<AuthenticatedIdentity, ProviderError> {
        tokio::task::yield_now().await;
        let result = if self.fail_logins {
            Err(ProviderError::NoLoginUser("no ticket cache".to_string()))
        } else {
            let mut record = self.record.lock().unwrap();
            let snapshot = record.config.clone();
            record.observed.push((self.login_user.clone(), snapshot));
            Ok(AuthenticatedIdentity::simple(self.login_user.clone()))
        };
        self.leave();
        result
    }

    async fn check_tgt_and_relogin(
        &mut self,
        identity: &AuthenticatedIdentity,
    ) -> Result<(), ProviderError> {
        let user = identity.user_name().to_string();
        *self
            .record
            .lock()
            .unwrap()
            .renewals_started
            .entry(user.clone())
            .or_default() += 1;

        let result = match self.renewal {
            RenewalBehavior::Succeed => Ok(()),
            RenewalBehavior::Fail => Err(ProviderError::Rejected("KDC unreachable".to_string())),
            RenewalBehavior::Panic => panic!("provider exploded"),
            RenewalBehavior::Slow(delay) => {
                tokio::time::sleep(delay).await;
                Ok(())
            }
        };

        *self
            .record
            .lock()
            .unwrap()
            .renewals_finished
            .entry(user)
            .or_default() += 1;
        result
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogEvent {
    Started(String),
    Attempt(String),
    Succeeded(String),
    Failed(String, String),
    Stopped(String),
}

/// Log sink that keeps every event in memory
#[derive(Default)]
pub struct RecordingLog {
    events: Mutex<Vec<LogEvent>>,
}

impl RecordingLog {
    pub fn events(&self) -> Vec<LogEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn failures(&self) -> Vec<(String, String)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                LogEvent::Failed(id, error) => Some((id, error)),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, f: impl Fn(&LogEvent) -> bool) -> usize {
        self.events().iter().filter(|e| f(e)).count()
    }

    fn push(&self, event: LogEvent) {
        self.events.lock().unwrap().push(event);
    }
}

impl RenewalLog for RecordingLog {
    fn renewal_started(&self, id: &str, _identity: &AuthenticatedIdentity, _period: Duration) {
        self.push(LogEvent::Started(id.to_string()));
    }

    fn renewal_attempt(&self, id: &str, _identity: &AuthenticatedIdentity) {
        self.push(LogEvent::Attempt(id.to_string()));
    }

    fn renewal_succeeded(&self, id: &str, _identity: &AuthenticatedIdentity) {
        self.push(LogEvent::Succeeded(id.to_string()));
    }

    fn renewal_failed(&self, id: &str, _identity: &AuthenticatedIdentity, error: &SecurityError) {
        self.push(LogEvent::Failed(id.to_string(), error.to_string()));
    }

    fn renewal_stopped(&self, id: &str) {
        self.push(LogEvent::Stopped(id.to_string()));
    }
}

lazy_static! {
    static ref PAUSED_CLOCK: tokio::sync::Mutex<()> = tokio::sync::Mutex::new(());
}

/// Renewals in every test contend for the one process-wide login lock, so tests
/// that count renewals on a paused clock take turns.
pub async fn exclusive_clock() -> MutexGuard<'static, ()> {
    PAUSED_CLOCK.lock().await
}

pub fn kerberos_identity(user: &str) -> AuthenticatedIdentity {
    AuthenticatedIdentity::kerberos(user, Some(PathBuf::from("/etc/krb5.keytab")), None)
}
