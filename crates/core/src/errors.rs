//! Bootstrap errors module

use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

use crate::collaborators::Collaborator;

/// A property whose value could not be turned into its typed form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidProperty {
    /// Property key
    pub key: String,
    /// Raw value found in the property source
    pub value: String,
    /// What the value was expected to be
    pub reason: String,
}

impl fmt::Display for InvalidProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}={}] ({})", self.key, self.value, self.reason)
    }
}

/// Fail-fast wiring and configuration errors.
///
/// Every variant carries all the problems found in one pass, never just the
/// first one.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error(
        "Missing collaborator(s) during server factory construction -{}",
        join_missing(.missing)
    )]
    MissingCollaborators { missing: BTreeSet<Collaborator> },

    #[error("Invalid configuration -{}", join_invalid(.invalid))]
    InvalidProperties { invalid: Vec<InvalidProperty> },

    #[error("Unknown transport '{name}' (available: {})", .available.join(", "))]
    UnknownTransport { name: String, available: Vec<String> },

    #[error("Failed to register metric '{name}': {reason}")]
    MetricRegistration { name: String, reason: String },
}

impl ConfigurationError {
    /// Collaborators reported missing, empty for other variants.
    pub fn missing(&self) -> Vec<Collaborator> {
        match self {
            ConfigurationError::MissingCollaborators { missing } => {
                missing.iter().copied().collect()
            }
            _ => Vec::new(),
        }
    }

    /// Keys reported invalid, empty for other variants.
    pub fn invalid_keys(&self) -> Vec<&str> {
        match self {
            ConfigurationError::InvalidProperties { invalid } => {
                invalid.iter().map(|p| p.key.as_str()).collect()
            }
            _ => Vec::new(),
        }
    }
}

fn join_missing(missing: &BTreeSet<Collaborator>) -> String {
    missing.iter().map(|c| format!(" [{}]", c)).collect()
}

fn join_invalid(invalid: &[InvalidProperty]) -> String {
    invalid.iter().map(|p| format!(" {}", p)).collect()
}

/// Errors raised by a server handle's lifecycle
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Server is already running")]
    AlreadyRunning,

    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },

    #[error("Server event loop failed: {reason}")]
    Serve { reason: String },

    #[error("Shutdown did not complete within {timeout_ms}ms")]
    ShutdownTimeout { timeout_ms: u64 },
}
