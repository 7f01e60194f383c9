//! Error types for the Beam engine.

use qc_01_poll::PollError;
use qc_02_topological::{ConsensusError, ParamsError};
use qc_03_quasar::QuasarError;
use shared_types::{BlockError, BlockId, CodecError, ErrorCategory};
use thiserror::Error;

/// Engine errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("Invalid engine configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid consensus parameters: {0}")]
    Params(#[from] ParamsError),

    #[error("Consensus error: {0}")]
    Consensus(#[from] ConsensusError),

    #[error("Poll error: {0}")]
    Poll(#[from] PollError),

    #[error("Quasar error: {0}")]
    Quasar(#[from] QuasarError),

    #[error("Block error: {0}")]
    Block(#[from] BlockError),

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    /// A `build_block` call is already in flight.
    #[error("Block building already in progress")]
    AlreadyBuilding,

    #[error("Engine already started")]
    AlreadyStarted,

    #[error("Engine not started")]
    NotStarted,

    /// Inbound queue closed by `stop`.
    #[error("Engine stopped")]
    Stopped,

    #[error("Inbound queue full")]
    InboundFull,

    /// No Ringtail certificate within the Quasar timeout.
    #[error("Quasar timeout at height {height}")]
    Timeout { height: u64 },

    /// Quantum-only operation while Quasar is off.
    #[error("Quasar is not enabled")]
    QuasarDisabled,

    #[error("Unknown block {0}")]
    UnknownBlock(BlockId),

    #[error("No validators to sample")]
    NoValidators,

    #[error("VM error: {0}")]
    Vm(String),

    #[error("BLS signing failed: {0}")]
    Bls(String),
}

impl EngineError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            EngineError::InvalidConfig(_)
            | EngineError::Params(_)
            | EngineError::AlreadyStarted
            | EngineError::NotStarted
            | EngineError::QuasarDisabled => ErrorCategory::Initialization,
            EngineError::Consensus(e) => e.category(),
            EngineError::Poll(e) => e.category(),
            EngineError::Quasar(QuasarError::Timeout { .. }) | EngineError::Timeout { .. } => {
                ErrorCategory::Timeout
            }
            EngineError::Quasar(e) => e.category(),
            EngineError::Block(e) => e.category(),
            EngineError::Codec(e) => e.category(),
            EngineError::AlreadyBuilding => ErrorCategory::Concurrency,
            EngineError::Stopped | EngineError::InboundFull => ErrorCategory::Transport,
            EngineError::UnknownBlock(_) | EngineError::NoValidators => ErrorCategory::Protocol,
            EngineError::Vm(_) => ErrorCategory::Application,
            EngineError::Bls(_) => ErrorCategory::Verification,
        }
    }
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;
