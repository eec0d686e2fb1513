use std::fmt;

use crate::config::SecurityConfig;

pub const HADOOP_SECURITY_AUTHENTICATION: &str = "hadoop.security.authentication";
pub const KERBEROS: &str = "kerberos";
pub const SIMPLE: &str = "simple";

/// Authentication mode configured for the cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityMode {
    Simple,
    Kerberos,
}

impl SecurityMode {
    /// Unknown or missing values fall back to `Simple`
    pub fn from_config(config: &SecurityConfig) -> Self {
        if is_security_enabled(config) {
            Self::Kerberos
        } else {
            Self::Simple
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Simple => SIMPLE,
            Self::Kerberos => KERBEROS,
        }
    }
}

impl fmt::Display for SecurityMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// True if `hadoop.security.authentication` is `kerberos`, ignoring case.
///
/// Reads only the supplied map, so it never goes through the authentication gate.
pub fn is_security_enabled(config: &SecurityConfig) -> bool {
    config
        .get(HADOOP_SECURITY_AUTHENTICATION)
        .map_or(false, |mode| mode.eq_ignore_ascii_case(KERBEROS))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_mode(mode: &str) -> SecurityConfig {
        SecurityConfig::from_iter([(HADOOP_SECURITY_AUTHENTICATION, mode)])
    }

    #[test]
    fn test_kerberos_upper_case_is_enabled() {
        assert!(is_security_enabled(&config_with_mode("KERBEROS")));
    }

    #[test]
    fn test_kerberos_mixed_case_is_enabled() {
        assert!(is_security_enabled(&config_with_mode("KerBeros")));
    }

    #[test]
    fn test_simple_is_disabled() {
        assert!(!is_security_enabled(&config_with_mode("simple")));
    }

    #[test]
    fn test_empty_config_is_disabled() {
        assert!(!is_security_enabled(&SecurityConfig::new()));
    }

    #[test]
    fn test_value_is_not_trimmed() {
        assert!(!is_security_enabled(&config_with_mode(" kerberos ")));
    }

    #[test]
    fn test_security_mode_from_config() {
        assert_eq!(
            SecurityMode::from_config(&config_with_mode("kerberos")),
            SecurityMode::Kerberos
        );
        assert_eq!(
            SecurityMode::from_config(&config_with_mode("token")),
            SecurityMode::Simple
        );
        assert_eq!(SecurityMode::Kerberos.to_string(), "kerberos");
    }
}
