//! # Error Types
//!
//! Block-level errors and the category taxonomy every crate maps into.

use crate::entities::Status;
use thiserror::Error;

/// Coarse classification shared by all consensus errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Malformed block: bad height, timestamp or parent linkage.
    Protocol,
    /// Missing or invalid certificate, failed signature check.
    Verification,
    /// Certificate not collected in time.
    Timeout,
    /// Conflicting concurrent operation.
    Concurrency,
    /// A block's accept/reject callback failed.
    Application,
    /// Invalid configuration or key material at construction.
    Initialization,
    /// Wire-format decoding failure.
    Codec,
    /// Collaborator (VM, network) failure.
    Transport,
}

/// Errors raised by block verification and status transitions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BlockError {
    /// Block timestamp lies in the future.
    #[error("Block timestamp {timestamp} is ahead of local time {now}")]
    FutureTimestamp { timestamp: i64, now: i64 },

    /// Height 0 must have the empty parent.
    #[error("Genesis block must not reference a parent")]
    GenesisWithParent,

    /// Non-genesis block without a parent reference.
    #[error("Block at height {height} has no parent")]
    MissingParent { height: u64 },

    /// Height does not extend the parent by exactly one.
    #[error("Block height {height} does not follow parent height {parent_height}")]
    HeightMismatch { height: u64, parent_height: u64 },

    /// Timestamp earlier than the parent's.
    #[error("Block timestamp {timestamp} precedes parent timestamp {parent_timestamp}")]
    TimestampBeforeParent { timestamp: i64, parent_timestamp: i64 },

    /// Exactly one of the two certificates is attached.
    #[error("Certificate bundle is partially attached")]
    PartialCertificates,

    /// Status transition not permitted from the current state.
    #[error("Invalid transition: cannot {action} a block in state {from}")]
    InvalidTransition { action: &'static str, from: Status },

    /// Quantum status requires both certificates.
    #[error("Quantum finality requires both BLS and Ringtail certificates")]
    MissingDualCertificate,

    /// Certificates can only be attached once.
    #[error("Certificates already attached")]
    CertificatesAlreadyAttached,

    /// Application callback failure.
    #[error("Application error: {0}")]
    Application(String),
}

impl BlockError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            BlockError::FutureTimestamp { .. }
            | BlockError::GenesisWithParent
            | BlockError::MissingParent { .. }
            | BlockError::HeightMismatch { .. }
            | BlockError::TimestampBeforeParent { .. }
            | BlockError::PartialCertificates => ErrorCategory::Protocol,
            BlockError::MissingDualCertificate | BlockError::CertificatesAlreadyAttached => {
                ErrorCategory::Verification
            }
            BlockError::InvalidTransition { .. } | BlockError::Application(_) => {
                ErrorCategory::Application
            }
        }
    }
}

/// Wire decoding errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// Input ended before a field could be read.
    #[error("Truncated input: needed {needed} bytes for {field}, {remaining} remaining")]
    Truncated {
        field: &'static str,
        needed: usize,
        remaining: usize,
    },

    /// Bytes left over after the last field.
    #[error("Trailing bytes after block encoding: {0}")]
    TrailingBytes(usize),
}

impl CodecError {
    pub fn category(&self) -> ErrorCategory {
        ErrorCategory::Codec
    }
}
