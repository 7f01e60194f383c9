//! Error types for the Quasar certifier.

use shared_types::{ErrorCategory, NodeId};
use thiserror::Error;

/// Quasar errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuasarError {
    /// Construction without Ringtail key material.
    #[error("Empty Ringtail secret key")]
    EmptySecretKey,

    /// Configuration failed validation.
    #[error("Invalid Quasar configuration: {0}")]
    InvalidConfig(String),

    /// Construction outside a tokio runtime.
    #[error("Quasar requires a tokio runtime")]
    NoRuntime,

    /// Block lacks the BLS aggregate or the Ringtail certificate.
    #[error("Block missing dual certificates")]
    MissingCertificate,

    #[error("BLS aggregate verification failed")]
    InvalidBls,

    #[error("Ringtail verification failed")]
    InvalidRingtail,

    /// Share from a node outside the validator set.
    #[error("Share from unknown validator {node}")]
    UnknownValidator { node: NodeId },

    #[error("Empty share from {node} at height {height}")]
    EmptyShare { height: u64, node: NodeId },

    /// Threshold signer failure.
    #[error("Signing failed: {0}")]
    Signing(String),

    /// No certificate within the configured timeout.
    #[error("Quasar timeout: missing Ringtail certificate at height {height}")]
    Timeout { height: u64 },

    /// Caller cancelled the wait.
    #[error("Certificate wait cancelled at height {height}")]
    Cancelled { height: u64 },

    /// Waiter discarded by pruning before a certificate arrived.
    #[error("Certificate waiter dropped at height {height}")]
    WaiterDropped { height: u64 },
}

impl QuasarError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            QuasarError::EmptySecretKey | QuasarError::InvalidConfig(_) | QuasarError::NoRuntime => {
                ErrorCategory::Initialization
            }
            QuasarError::MissingCertificate
            | QuasarError::InvalidBls
            | QuasarError::InvalidRingtail
            | QuasarError::UnknownValidator { .. }
            | QuasarError::EmptyShare { .. }
            | QuasarError::Signing(_) => ErrorCategory::Verification,
            QuasarError::Timeout { .. }
            | QuasarError::Cancelled { .. }
            | QuasarError::WaiterDropped { .. } => ErrorCategory::Timeout,
        }
    }
}

/// Result type for Quasar operations
pub type QuasarResult<T> = Result<T, QuasarError>;
