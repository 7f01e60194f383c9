//! # Core Domain Entities
//!
//! Identifiers, block status and the dual-certificate bundle.

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, Bytes};
use std::fmt;

/// Size of a block identifier in bytes (SHA-256 digest).
pub const BLOCK_ID_LEN: usize = 32;

/// Size of a node identifier in bytes.
pub const NODE_ID_LEN: usize = 20;

/// Size of an aggregated BLS signature in bytes.
pub const BLS_AGGREGATE_LEN: usize = 96;

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Content hash identifying a block.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct BlockId(pub [u8; BLOCK_ID_LEN]);

impl BlockId {
    /// The all-zero id, used as the parent of genesis.
    pub const EMPTY: BlockId = BlockId([0u8; BLOCK_ID_LEN]);

    pub fn is_empty(&self) -> bool {
        *self == Self::EMPTY
    }

    pub fn as_bytes(&self) -> &[u8; BLOCK_ID_LEN] {
        &self.0
    }
}

impl From<[u8; BLOCK_ID_LEN]> for BlockId {
    fn from(bytes: [u8; BLOCK_ID_LEN]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl fmt::Debug for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockId({})", hex::encode(&self.0[..8]))
    }
}

/// Identifier of a validator node.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct NodeId(pub [u8; NODE_ID_LEN]);

impl NodeId {
    pub fn as_bytes(&self) -> &[u8; NODE_ID_LEN] {
        &self.0
    }
}

impl From<[u8; NODE_ID_LEN]> for NodeId {
    fn from(bytes: [u8; NODE_ID_LEN]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", hex::encode(&self.0[..6]))
    }
}

// =============================================================================
// STATUS
// =============================================================================

/// Decision status of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Status {
    /// Tracked but undecided.
    #[default]
    Processing,
    /// Finalized by metastable voting.
    Accepted,
    /// Lost a conflict, or descends from a block that did.
    Rejected,
    /// Accepted and carrying both BLS and Ringtail certificates.
    Quantum,
}

impl Status {
    /// Whether the block has left the processing state.
    pub fn decided(&self) -> bool {
        !matches!(self, Status::Processing)
    }

    /// Accepted or better.
    pub fn is_accepted(&self) -> bool {
        matches!(self, Status::Accepted | Status::Quantum)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Status::Processing => "Processing",
            Status::Accepted => "Accepted",
            Status::Rejected => "Rejected",
            Status::Quantum => "Quantum",
        };
        f.write_str(s)
    }
}

// =============================================================================
// CERTIFICATES
// =============================================================================

/// BLS aggregate plus Ringtail threshold certificate.
///
/// An all-zero `bls_aggregate` and an empty `rt_certificate` mean "absent".
#[serde_as]
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertBundle {
    #[serde_as(as = "Bytes")]
    pub bls_aggregate: [u8; BLS_AGGREGATE_LEN],
    pub rt_certificate: Vec<u8>,
}

impl CertBundle {
    pub fn new(bls_aggregate: [u8; BLS_AGGREGATE_LEN], rt_certificate: Vec<u8>) -> Self {
        Self {
            bls_aggregate,
            rt_certificate,
        }
    }

    pub fn has_bls(&self) -> bool {
        self.bls_aggregate.iter().any(|b| *b != 0)
    }

    pub fn has_ringtail(&self) -> bool {
        !self.rt_certificate.is_empty()
    }

    /// Both certificates present.
    pub fn is_dual(&self) -> bool {
        self.has_bls() && self.has_ringtail()
    }

    /// Neither certificate present.
    pub fn is_empty(&self) -> bool {
        !self.has_bls() && !self.has_ringtail()
    }
}

impl Default for CertBundle {
    fn default() -> Self {
        Self {
            bls_aggregate: [0u8; BLS_AGGREGATE_LEN],
            rt_certificate: Vec::new(),
        }
    }
}

impl fmt::Debug for CertBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CertBundle")
            .field("bls", &self.has_bls())
            .field("rt_certificate_len", &self.rt_certificate.len())
            .finish()
    }
}
