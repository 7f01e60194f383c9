//! Local validator identity and key material.

use shared_types::NodeId;
use std::fmt;

/// Who this engine signs as, and the group keys it verifies against.
#[derive(Clone)]
pub struct NodeIdentity {
    pub node_id: NodeId,
    /// Ringtail share key. Required when Quasar is enabled.
    pub ringtail_secret: Vec<u8>,
    /// BLS aggregate public key.
    pub bls_public_key: Vec<u8>,
    /// Ringtail group public key.
    pub ringtail_public_key: Vec<u8>,
}

impl fmt::Debug for NodeIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeIdentity")
            .field("node_id", &self.node_id)
            .field("ringtail_secret", &"<redacted>")
            .field("bls_public_key_len", &self.bls_public_key.len())
            .field("ringtail_public_key_len", &self.ringtail_public_key.len())
            .finish()
    }
}
