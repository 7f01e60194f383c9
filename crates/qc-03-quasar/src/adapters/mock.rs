//! # Mock Threshold Crypto
//!
//! ```text
//! share       = digest (32) || expand(sha256(material || digest), 398)
//! certificate = digest (32) || expand(sha256(group_key || digest), 3040)
//! bls         = expand(sha256("bls" || public_key || message), 96)
//! ```
//!
//! `material` is the precomputed item or, without one, the secret key.

use crate::domain::{Certificate, Precomputed, Share, CERTIFICATE_SIZE, SHARE_SIZE};
use crate::ports::{CertificateVerifier, ThresholdSigner};
use sha2::{Digest, Sha256};
use shared_types::BLS_AGGREGATE_LEN;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

const DIGEST_LEN: usize = 32;

/// Stretch `seed` to `len` bytes with chained SHA-256.
fn expand(seed: &[u8], len: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(len);
    let mut counter: u32 = 0;
    while out.len() < len {
        let mut hasher = Sha256::new();
        hasher.update(seed);
        hasher.update(counter.to_le_bytes());
        out.extend_from_slice(&hasher.finalize());
        counter += 1;
    }
    out.truncate(len);
    out
}

fn hash_concat(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

/// Deterministic BLS stand-in shared by signer and verifier.
pub fn mock_bls_signature(public_key: &[u8], message: &[u8]) -> [u8; BLS_AGGREGATE_LEN] {
    let seed = hash_concat(&[b"bls", public_key, message]);
    let mut out = [0u8; BLS_AGGREGATE_LEN];
    out.copy_from_slice(&expand(&seed, BLS_AGGREGATE_LEN));
    out
}

fn mock_certificate(group_key: &[u8], digest: &[u8; 32]) -> Certificate {
    let mut cert = Vec::with_capacity(CERTIFICATE_SIZE);
    cert.extend_from_slice(digest);
    let seed = hash_concat(&[group_key, digest]);
    cert.extend(expand(&seed, CERTIFICATE_SIZE - DIGEST_LEN));
    cert
}

/// Mock Ringtail threshold signer.
#[derive(Debug, Default)]
pub struct MockThresholdSigner {
    group_key: Vec<u8>,
    counter: AtomicU64,
    fail_sign: AtomicBool,
    fail_aggregate: AtomicBool,
}

impl MockThresholdSigner {
    pub fn new(group_key: impl Into<Vec<u8>>) -> Self {
        Self {
            group_key: group_key.into(),
            ..Default::default()
        }
    }

    pub fn group_key(&self) -> &[u8] {
        &self.group_key
    }

    /// Make `sign` and `quick_sign` fail.
    pub fn set_fail_sign(&self, fail: bool) {
        self.fail_sign.store(fail, Ordering::SeqCst);
    }

    /// Make `aggregate` fail.
    pub fn set_fail_aggregate(&self, fail: bool) {
        self.fail_aggregate.store(fail, Ordering::SeqCst);
    }

    fn make_share(&self, material: &[u8], digest: &[u8; 32]) -> Result<Share, String> {
        if self.fail_sign.load(Ordering::SeqCst) {
            return Err("mock signer configured to fail".into());
        }
        let mut share = Vec::with_capacity(SHARE_SIZE);
        share.extend_from_slice(digest);
        let seed = hash_concat(&[material, digest]);
        share.extend(expand(&seed, SHARE_SIZE - DIGEST_LEN));
        Ok(share)
    }
}

impl ThresholdSigner for MockThresholdSigner {
    fn precompute(&self, secret: &[u8]) -> Result<Precomputed, String> {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        Ok(hash_concat(&[secret, &n.to_le_bytes()]).to_vec())
    }

    fn quick_sign(&self, precomputed: Precomputed, digest: &[u8; 32]) -> Result<Share, String> {
        self.make_share(&precomputed, digest)
    }

    fn sign(&self, secret: &[u8], digest: &[u8; 32]) -> Result<Share, String> {
        self.make_share(secret, digest)
    }

    fn aggregate(&self, shares: &[Share]) -> Result<Certificate, String> {
        if self.fail_aggregate.load(Ordering::SeqCst) {
            return Err("mock aggregation configured to fail".into());
        }
        let first = shares.first().ok_or("no shares to aggregate")?;
        if shares.iter().any(|s| s.len() != SHARE_SIZE) {
            return Err(format!("share size must be {SHARE_SIZE} bytes"));
        }
        let digest = &first[..DIGEST_LEN];
        if shares.iter().any(|s| &s[..DIGEST_LEN] != digest) {
            return Err("shares sign different messages".into());
        }
        let mut fixed = [0u8; DIGEST_LEN];
        fixed.copy_from_slice(digest);
        Ok(mock_certificate(&self.group_key, &fixed))
    }
}

/// Verifier matching [`MockThresholdSigner`] and [`mock_bls_signature`].
#[derive(Debug, Default, Clone, Copy)]
pub struct MockCertificateVerifier;

impl CertificateVerifier for MockCertificateVerifier {
    fn verify_bls(&self, public_key: &[u8], message: &[u8], signature: &[u8]) -> bool {
        mock_bls_signature(public_key, message).as_slice() == signature
    }

    fn verify_ringtail(&self, public_key: &[u8], digest: &[u8; 32], certificate: &[u8]) -> bool {
        certificate.len() == CERTIFICATE_SIZE
            && mock_certificate(public_key, digest).as_slice() == certificate
    }
}
