//! Deterministic BLS stand-in.

use crate::ports::BlsSigner;
use qc_03_quasar::adapters::mock_bls_signature;
use shared_types::BLS_AGGREGATE_LEN;

/// Signs with `mock_bls_signature` under a fixed public key.
#[derive(Debug, Clone)]
pub struct MockBlsSigner {
    public_key: Vec<u8>,
}

impl MockBlsSigner {
    pub fn new(public_key: impl Into<Vec<u8>>) -> Self {
        Self {
            public_key: public_key.into(),
        }
    }

    pub fn public_key(&self) -> &[u8] {
        &self.public_key
    }
}

impl BlsSigner for MockBlsSigner {
    fn sign(&self, message: &[u8]) -> Result<[u8; BLS_AGGREGATE_LEN], String> {
        Ok(mock_bls_signature(&self.public_key, message))
    }
}
