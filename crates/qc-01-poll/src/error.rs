//! Error types for the poll set.

use shared_types::{ErrorCategory, NodeId};
use thiserror::Error;

/// Poll errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PollError {
    /// A poll with this request id is already open.
    #[error("Poll {request_id} already exists")]
    AlreadyExists { request_id: u32 },

    /// No open poll with this request id.
    #[error("Poll {request_id} not found")]
    NotFound { request_id: u32 },

    /// Vote arrived after the poll finished.
    #[error("Poll {request_id} already finished")]
    AlreadyFinished { request_id: u32 },

    /// Voter was not sampled for this poll.
    #[error("Node {voter} not in voter set of poll {request_id}")]
    UnexpectedVoter { request_id: u32, voter: NodeId },

    /// Result requested before every voter answered.
    #[error("Poll {request_id} not finished")]
    NotFinished { request_id: u32 },
}

impl PollError {
    pub fn category(&self) -> ErrorCategory {
        ErrorCategory::Protocol
    }
}
