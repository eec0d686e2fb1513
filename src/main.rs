use std::env::var;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use lazy_static::lazy_static;
use tracing_appender::non_blocking::WorkerGuard;

use hadoop_security::{
    AuthenticatedIdentity, AuthenticationGate, IdentityConfig, KinitProvider, SecurityConfig,
    TracingRenewalLog,
};

type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

const RENEWAL_TASK_ID: &str = "kerberos-renewer";

lazy_static! {
    static ref SECURITY_CONFIG_PATH: String =
        var("SECURITY_CONFIG_PATH").unwrap_or_else(|_| "./security.json".to_string());
    static ref KERBEROS_PRINCIPAL: Option<String> = var("KERBEROS_PRINCIPAL").ok();
    static ref KERBEROS_KEYTAB: Option<String> = var("KERBEROS_KEYTAB").ok();
    static ref TICKET_RENEWAL_PERIOD_SECS: u64 = var("TICKET_RENEWAL_PERIOD_SECS")
        .ok()
        .and_then(|s| s.parse().ok())
        .filter(|secs| *secs > 0)
        .unwrap_or(3600);
}

#[tokio::main]
async fn main() -> Result<()> {
    let _guard = init_logger()?;

    let security_config = load_security_config().await?;
    let mut identity_config = IdentityConfig::new(security_config);
    if let Some(principal) = KERBEROS_PRINCIPAL.as_ref() {
        identity_config = identity_config.with_principal(principal.as_str());
    }
    if let Some(keytab) = KERBEROS_KEYTAB.as_ref() {
        identity_config = identity_config.with_keytab(keytab.as_str());
    }

    let gate = AuthenticationGate::new(KinitProvider::new());

    let identity = login(&gate, &identity_config).await?;
    if !AuthenticationGate::is_security_enabled(&identity_config) {
        tracing::info!(identity = %identity, "Kerberos disabled, nothing to renew");
        return Ok(());
    }
    tracing::info!(identity = %identity, "Starting ticket renewal");

    let supervisor = gate.start_ticket_renewal_thread(
        RENEWAL_TASK_ID,
        identity,
        Duration::from_secs(*TICKET_RENEWAL_PERIOD_SECS),
        Arc::new(TracingRenewalLog),
    )?;

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down");
    supervisor.shutdown().await;
    Ok(())
}

/// Keytab login when a keytab is configured, otherwise the existing login user.
///
/// With Kerberos on and no keytab, the login user comes from the ticket cache
/// and is renewed with `kinit -R`.
async fn login(
    gate: &AuthenticationGate,
    config: &IdentityConfig,
) -> Result<AuthenticatedIdentity> {
    let use_keytab =
        AuthenticationGate::is_security_enabled(config) && config.keytab_path().is_some();
    let identity = if use_keytab {
        gate.login_with_keytab(config).await?
    } else {
        gate.login_simple(config).await?
    };
    Ok(identity)
}

/// File settings first, `HADOOP_*` environment variables on top
async fn load_security_config() -> Result<SecurityConfig> {
    let path = Path::new(SECURITY_CONFIG_PATH.as_str());
    let from_file = if path.exists() {
        SecurityConfig::load_file(path).await?
    } else {
        tracing::debug!("No security configuration file at {:?}", path);
        SecurityConfig::new()
    };
    Ok(from_file.merge(SecurityConfig::from_env()))
}

/// Plain text logs, or bunyan JSON lines on stdout when `JSON_LOG=true`.
///
/// `RUST_LOG` overrides the default `info` level.
fn init_logger() -> Result<Option<WorkerGuard>> {
    use tracing_bunyan_formatter::{BunyanFormattingLayer, JsonStorageLayer};
    use tracing_log::LogTracer;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::{EnvFilter, Registry};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if !var("JSON_LOG").map_or(false, |s| s.parse().unwrap_or_default()) {
        tracing_subscriber::fmt().with_env_filter(filter).try_init()?;
        return Ok(None);
    }

    // Records from crates that use `log` end up in the same JSON stream
    LogTracer::init()?;

    let (writer, guard) = tracing_appender::non_blocking(std::io::stdout());
    let subscriber = Registry::default()
        .with(filter)
        .with(JsonStorageLayer)
        .with(BunyanFormattingLayer::new(app_name(), writer));
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(Some(guard))
}

/// `name` field of every JSON log line
fn app_name() -> String {
    format!("{}-{}", env!("CARGO_BIN_NAME"), env!("CARGO_PKG_VERSION"))
}
