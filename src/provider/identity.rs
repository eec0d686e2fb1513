use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthenticationMethod {
    Simple,
    Kerberos,
}

/// A successfully authenticated principal, as returned by a login
#[derive(Debug, Clone)]
pub struct AuthenticatedIdentity {
    user_name: String,
    method: AuthenticationMethod,
    keytab: Option<PathBuf>,
    ticket_cache: Option<PathBuf>,
    logged_in_at: DateTime<Utc>,
}

impl AuthenticatedIdentity {
    pub fn kerberos(
        user_name: impl Into<String>,
        keytab: Option<PathBuf>,
        ticket_cache: Option<PathBuf>,
    ) -> Self {
        Self {
            user_name: user_name.into(),
            method: AuthenticationMethod::Kerberos,
            keytab,
            ticket_cache,
            logged_in_at: Utc::now(),
        }
    }

    pub fn simple(user_name: impl Into<String>) -> Self {
        Self {
            user_name: user_name.into(),
            method: AuthenticationMethod::Simple,
            keytab: None,
            ticket_cache: None,
            logged_in_at: Utc::now(),
        }
    }

    pub fn user_name(&self) -> &str {
        &self.user_name
    }

    pub fn method(&self) -> AuthenticationMethod {
        self.method
    }

    pub fn keytab(&self) -> Option<&Path> {
        self.keytab.as_deref()
    }

    pub fn ticket_cache(&self) -> Option<&Path> {
        self.ticket_cache.as_deref()
    }

    pub fn logged_in_at(&self) -> DateTime<Utc> {
        self.logged_in_at
    }

    pub fn is_from_keytab(&self) -> bool {
        self.method == AuthenticationMethod::Kerberos && self.keytab.is_some()
    }
}

impl fmt::Display for AuthenticatedIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let method = match self.method {
            AuthenticationMethod::Simple => "SIMPLE",
            AuthenticationMethod::Kerberos if self.keytab.is_some() => "KERBEROS (keytab)",
            AuthenticationMethod::Kerberos => "KERBEROS",
        };
        write!(f, "{} (auth:{})", self.user_name, method)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keytab_identity_display() {
        let identity = AuthenticatedIdentity::kerberos(
            "alice@EXAMPLE.COM",
            Some(PathBuf::from("/etc/keytabs/alice.keytab")),
            None,
        );
        assert!(identity.is_from_keytab());
        assert_eq!(identity.to_string(), "alice@EXAMPLE.COM (auth:KERBEROS (keytab))");
    }

    #[test]
    fn test_simple_identity_is_not_from_keytab() {
        let identity = AuthenticatedIdentity::simple("hdfs");
        assert!(!identity.is_from_keytab());
        assert_eq!(identity.method(), AuthenticationMethod::Simple);
        assert_eq!(identity.to_string(), "hdfs (auth:SIMPLE)");
    }
}
