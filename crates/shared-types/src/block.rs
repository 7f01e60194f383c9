//! # Block
//!
//! The unit of consensus: header fields, opaque transactions, an optional
//! dual-certificate bundle and the decision status.
//!
//! ## Wire Layout (little-endian)
//!
//! ```text
//! parent_id     32 bytes
//! height        u64
//! timestamp     i64
//! proposer_id   20 bytes
//! tx_count      u32
//!   tx_len      u32      } repeated tx_count times
//!   tx_bytes    tx_len   }
//! bls_aggregate 96 bytes (zero-filled if absent)
//! rt_cert_len   u32
//! rt_cert_bytes rt_cert_len
//! ```
//!
//! The block id is the SHA-256 digest of this encoding, so it changes when
//! certificates are attached.

use crate::entities::{
    BlockId, CertBundle, NodeId, Status, BLOCK_ID_LEN, BLS_AGGREGATE_LEN, NODE_ID_LEN,
};
use crate::errors::{BlockError, CodecError};
use sha2::{Digest, Sha256};
use std::sync::OnceLock;

/// A candidate or decided block.
#[derive(Debug, Clone)]
pub struct Block {
    parent_id: BlockId,
    height: u64,
    timestamp: i64,
    proposer_id: NodeId,
    transactions: Vec<Vec<u8>>,
    certs: CertBundle,
    status: Status,
    id: OnceLock<BlockId>,
}

impl Block {
    /// Create a processing block without certificates.
    pub fn new(
        parent_id: BlockId,
        height: u64,
        timestamp: i64,
        proposer_id: NodeId,
        transactions: Vec<Vec<u8>>,
    ) -> Self {
        Self {
            parent_id,
            height,
            timestamp,
            proposer_id,
            transactions,
            certs: CertBundle::default(),
            status: Status::Processing,
            id: OnceLock::new(),
        }
    }

    /// Genesis block at height 0, already accepted.
    pub fn genesis(timestamp: i64) -> Self {
        let mut block = Self::new(BlockId::EMPTY, 0, timestamp, NodeId::default(), Vec::new());
        block.status = Status::Accepted;
        block
    }

    pub fn id(&self) -> BlockId {
        *self.id.get_or_init(|| BlockId(sha256(&self.encode())))
    }

    pub fn parent_id(&self) -> BlockId {
        self.parent_id
    }

    pub fn height(&self) -> u64 {
        self.height
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn proposer_id(&self) -> NodeId {
        self.proposer_id
    }

    pub fn transactions(&self) -> &[Vec<u8>] {
        &self.transactions
    }

    pub fn certs(&self) -> &CertBundle {
        &self.certs
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn has_dual_cert(&self) -> bool {
        self.certs.is_dual()
    }

    /// Digest of the block with an empty certificate bundle.
    ///
    /// This is the message BLS and Ringtail shares sign.
    pub fn signing_digest(&self) -> [u8; 32] {
        let mut out = Vec::with_capacity(self.encoded_len());
        self.encode_header(&mut out);
        encode_certs(&CertBundle::default(), &mut out);
        sha256(&out)
    }

    // =========================================================================
    // VERIFICATION AND STATUS
    // =========================================================================

    /// Structural checks against the local clock (unix seconds).
    pub fn verify(&self, now: i64) -> Result<(), BlockError> {
        if self.timestamp > now {
            return Err(BlockError::FutureTimestamp {
                timestamp: self.timestamp,
                now,
            });
        }
        if self.height == 0 && !self.parent_id.is_empty() {
            return Err(BlockError::GenesisWithParent);
        }
        if self.height > 0 && self.parent_id.is_empty() {
            return Err(BlockError::MissingParent {
                height: self.height,
            });
        }
        if !self.certs.is_empty() && !self.certs.is_dual() {
            return Err(BlockError::PartialCertificates);
        }
        Ok(())
    }

    /// Accept the block. Accepting an accepted block is a no-op.
    pub fn accept(&mut self) -> Result<(), BlockError> {
        match self.status {
            Status::Processing => {
                self.status = Status::Accepted;
                Ok(())
            }
            Status::Accepted | Status::Quantum => Ok(()),
            Status::Rejected => Err(BlockError::InvalidTransition {
                action: "accept",
                from: self.status,
            }),
        }
    }

    /// Reject the block. Rejecting a rejected block is a no-op.
    pub fn reject(&mut self) -> Result<(), BlockError> {
        match self.status {
            Status::Processing => {
                self.status = Status::Rejected;
                Ok(())
            }
            Status::Rejected => Ok(()),
            Status::Accepted | Status::Quantum => Err(BlockError::InvalidTransition {
                action: "reject",
                from: self.status,
            }),
        }
    }

    /// Promote an accepted, dual-certified block to quantum finality.
    pub fn set_quantum(&mut self) -> Result<(), BlockError> {
        if self.status != Status::Accepted {
            return Err(BlockError::InvalidTransition {
                action: "finalize",
                from: self.status,
            });
        }
        if !self.has_dual_cert() {
            return Err(BlockError::MissingDualCertificate);
        }
        self.status = Status::Quantum;
        Ok(())
    }

    /// Attach both certificates. Fails if either is already present.
    pub fn attach_certificates(
        &mut self,
        bls_aggregate: [u8; BLS_AGGREGATE_LEN],
        rt_certificate: Vec<u8>,
    ) -> Result<(), BlockError> {
        if !self.certs.is_empty() {
            return Err(BlockError::CertificatesAlreadyAttached);
        }
        self.certs = CertBundle::new(bls_aggregate, rt_certificate);
        self.id = OnceLock::new();
        Ok(())
    }

    // =========================================================================
    // CODEC
    // =========================================================================

    /// Encode into the wire layout.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.encoded_len());
        self.encode_header(&mut out);
        encode_certs(&self.certs, &mut out);
        out
    }

    /// Strict decoder: truncated input or trailing bytes are errors.
    ///
    /// Parsed blocks start in `Processing`.
    pub fn parse(bytes: &[u8]) -> Result<Self, CodecError> {
        let mut r = Reader::new(bytes);

        let parent_id = BlockId(r.array::<BLOCK_ID_LEN>("parent_id")?);
        let height = u64::from_le_bytes(r.array("height")?);
        let timestamp = i64::from_le_bytes(r.array("timestamp")?);
        let proposer_id = NodeId(r.array::<NODE_ID_LEN>("proposer_id")?);

        let tx_count = u32::from_le_bytes(r.array("tx_count")?) as usize;
        // Each transaction carries at least its 4-byte length prefix.
        let mut transactions = Vec::with_capacity(tx_count.min(r.remaining() / 4));
        for _ in 0..tx_count {
            let len = u32::from_le_bytes(r.array("tx_len")?) as usize;
            transactions.push(r.take("tx_bytes", len)?.to_vec());
        }

        let bls_aggregate = r.array::<BLS_AGGREGATE_LEN>("bls_aggregate")?;
        let rt_len = u32::from_le_bytes(r.array("rt_cert_len")?) as usize;
        let rt_certificate = r.take("rt_cert_bytes", rt_len)?.to_vec();

        if r.remaining() > 0 {
            return Err(CodecError::TrailingBytes(r.remaining()));
        }

        let mut block = Self::new(parent_id, height, timestamp, proposer_id, transactions);
        block.certs = CertBundle::new(bls_aggregate, rt_certificate);
        Ok(block)
    }

    fn encoded_len(&self) -> usize {
        BLOCK_ID_LEN
            + 8
            + 8
            + NODE_ID_LEN
            + 4
            + self.transactions.iter().map(|tx| 4 + tx.len()).sum::<usize>()
            + BLS_AGGREGATE_LEN
            + 4
            + self.certs.rt_certificate.len()
    }

    fn encode_header(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(self.parent_id.as_bytes());
        out.extend_from_slice(&self.height.to_le_bytes());
        out.extend_from_slice(&self.timestamp.to_le_bytes());
        out.extend_from_slice(self.proposer_id.as_bytes());
        out.extend_from_slice(&(self.transactions.len() as u32).to_le_bytes());
        for tx in &self.transactions {
            out.extend_from_slice(&(tx.len() as u32).to_le_bytes());
            out.extend_from_slice(tx);
        }
    }
}

fn encode_certs(certs: &CertBundle, out: &mut Vec<u8>) {
    out.extend_from_slice(&certs.bls_aggregate);
    out.extend_from_slice(&(certs.rt_certificate.len() as u32).to_le_bytes());
    out.extend_from_slice(&certs.rt_certificate);
}

fn sha256(bytes: &[u8]) -> [u8; 32] {
    Sha256::digest(bytes).into()
}

/// Bounds-checked cursor over an input buffer.
struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, field: &'static str, n: usize) -> Result<&'a [u8], CodecError> {
        if n > self.remaining() {
            return Err(CodecError::Truncated {
                field,
                needed: n,
                remaining: self.remaining(),
            });
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self, field: &'static str) -> Result<[u8; N], CodecError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(field, N)?);
        Ok(out)
    }
}
