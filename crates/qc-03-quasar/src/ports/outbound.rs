//! Driven Ports (SPI - Outbound Dependencies)
//!
//! The cryptographic primitives are external. These traits are the only
//! surface the certifier needs from them.

use crate::domain::{Certificate, Precomputed, Share};

/// Ringtail threshold signing.
pub trait ThresholdSigner: Send + Sync {
    /// Produce one unit of precomputed signing material.
    fn precompute(&self, secret: &[u8]) -> Result<Precomputed, String>;

    /// Sign a digest using precomputed material.
    fn quick_sign(&self, precomputed: Precomputed, digest: &[u8; 32]) -> Result<Share, String>;

    /// Sign a digest directly with the secret key.
    fn sign(&self, secret: &[u8], digest: &[u8; 32]) -> Result<Share, String>;

    /// Combine threshold shares into a certificate.
    fn aggregate(&self, shares: &[Share]) -> Result<Certificate, String>;
}

/// Certificate verification.
pub trait CertificateVerifier: Send + Sync {
    /// Check a BLS aggregate over `message`.
    fn verify_bls(&self, public_key: &[u8], message: &[u8], signature: &[u8]) -> bool;

    /// Check a Ringtail certificate over `digest`.
    fn verify_ringtail(&self, public_key: &[u8], digest: &[u8; 32], certificate: &[u8]) -> bool;
}
