use std::path::PathBuf;

use thiserror::Error;

use crate::provider::ProviderError;

#[derive(Debug, Error)]
pub enum SecurityError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Kerberos {action} failed for {principal}: {source}")]
    AuthenticationFailure {
        action: &'static str,
        principal: String,
        #[source]
        source: ProviderError,
    },

    #[error("Unable to schedule ticket renewal [{id}]: {reason}")]
    SchedulingFailure { id: String, reason: String },

    #[error("Identity provider panicked during {action}: {message}")]
    ProviderPanicked {
        action: &'static str,
        message: String,
    },

    #[error("Failed to read security configuration {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse security configuration JSON: {0}")]
    ConfigParse(#[from] serde_json::Error),
}

impl SecurityError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }
}
