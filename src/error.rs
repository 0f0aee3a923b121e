use std::time::Duration;

use thiserror::Error;

use crate::driver::MachineState;
use crate::provider::ProviderError;

#[derive(Error, Debug)]
pub enum DriverError {
    #[error("Configuration error: {0}")]
    Config(String),

    /// Credentials could not be turned into an API client, or the token
    /// endpoint rejected them.
    #[error("Authentication failed: {0}")]
    Auth(#[source] ProviderError),

    #[error("Provider error: {0}")]
    Provider(#[source] ProviderError),

    /// A status query failed while waiting for a target state.
    #[error("Could not get Server state while waiting for {target}: {source}")]
    Convergence {
        target: MachineState,
        #[source]
        source: Box<DriverError>,
    },

    /// The provider reported a state the driver maps to `Error`.
    #[error("Server state could not be retrieved while waiting for {target}")]
    StateUnavailable { target: MachineState },

    #[error("Timed out after {elapsed:?} waiting for machine to reach {target}")]
    Timeout {
        target: MachineState,
        elapsed: Duration,
    },

    /// A verb that needs a provisioned server was called before Create.
    #[error("Cannot {verb}: no server has been created for this machine")]
    NoInstance { verb: &'static str },

    /// Context wrapper naming the verb that failed.
    #[error("{verb} failed: {source}")]
    Verb {
        verb: &'static str,
        #[source]
        source: Box<DriverError>,
    },

    #[error("SSH key error: {0}")]
    Ssh(String),

    #[error("Machine store error: {0}")]
    Store(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<ProviderError> for DriverError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Authentication { .. } => Self::Auth(err),
            other => Self::Provider(other),
        }
    }
}

impl DriverError {
    /// Attach the failing verb's name.
    pub fn during(self, verb: &'static str) -> Self {
        Self::Verb {
            verb,
            source: Box::new(self),
        }
    }

    /// Innermost error, skipping verb and convergence wrappers.
    #[allow(dead_code)]
    pub fn root(&self) -> &DriverError {
        match self {
            Self::Verb { source, .. } | Self::Convergence { source, .. } => source.root(),
            other => other,
        }
    }

    /// Status code of the provider rejection behind this error, if any.
    #[allow(dead_code)]
    pub fn provider_status(&self) -> Option<u16> {
        match self.root() {
            Self::Provider(e) | Self::Auth(e) => e.status(),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, DriverError>;
