//! Domain layer for the Quasar certifier.

pub mod pool;

pub use pool::{PoolStats, PrecomputePool};

use sha2::{Digest, Sha256};

/// One validator's partial Ringtail signature.
pub type Share = Vec<u8>;

/// Aggregated Ringtail threshold certificate.
pub type Certificate = Vec<u8>;

/// Opaque precomputed signing material.
pub type Precomputed = Vec<u8>;

/// Ringtail share size in bytes.
pub const SHARE_SIZE: usize = 430;

/// Ringtail certificate size in bytes.
pub const CERTIFICATE_SIZE: usize = 3072;

/// Identifies one registered certificate waiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WaiterId(pub u64);

/// Digest a share signs: SHA-256 of the message.
pub fn share_digest(message: &[u8]) -> [u8; 32] {
    Sha256::digest(message).into()
}
