//! Error types for topological consensus.

use shared_types::{BlockError, ErrorCategory};
use thiserror::Error;

/// Invalid consensus parameters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParamsError {
    #[error("K must be at least 1")]
    InvalidK,

    #[error("AlphaPreference {alpha} must be in ({k}/2, {k}]")]
    InvalidAlphaPreference { alpha: usize, k: usize },

    #[error(
        "AlphaConfidence {alpha_confidence} must be in [{alpha_preference}, {k}]"
    )]
    InvalidAlphaConfidence {
        alpha_confidence: usize,
        alpha_preference: usize,
        k: usize,
    },

    #[error("Beta must be at least 1")]
    InvalidBeta,

    #[error("ConcurrentRepolls {repolls} must be in [1, {beta}]")]
    InvalidConcurrentRepolls { repolls: usize, beta: usize },

    #[error("{0} must be positive")]
    NonPositive(&'static str),

    #[error("Parameter file I/O failed: {0}")]
    Io(String),

    #[error("Parameter file malformed: {0}")]
    Parse(String),
}

/// Consensus store errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConsensusError {
    /// Operation before `initialize`.
    #[error("Consensus not initialized")]
    NotInitialized,

    /// `initialize` called twice.
    #[error("Consensus already initialized")]
    AlreadyInitialized,

    #[error("Invalid parameters: {0}")]
    InvalidParameters(#[from] ParamsError),

    /// Block failed its own verification.
    #[error("Block verification failed: {0}")]
    Verification(#[from] BlockError),
}

impl ConsensusError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ConsensusError::NotInitialized
            | ConsensusError::AlreadyInitialized
            | ConsensusError::InvalidParameters(_) => ErrorCategory::Initialization,
            ConsensusError::Verification(e) => e.category(),
        }
    }
}

/// Result type for consensus operations
pub type ConsensusResult<T> = Result<T, ConsensusError>;
