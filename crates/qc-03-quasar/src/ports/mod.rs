//! Ports for the Quasar certifier.

pub mod outbound;

pub use outbound::{CertificateVerifier, ThresholdSigner};
