//! Reference adapters for the Quasar ports.
//!
//! Deterministic SHA-256 stand-ins for Ringtail and BLS. Sizes match the
//! real schemes so wire and storage paths see realistic payloads.

pub mod mock;

pub use mock::{mock_bls_signature, MockCertificateVerifier, MockThresholdSigner};
