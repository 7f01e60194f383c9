//! Published events (Outgoing)

use serde::{Deserialize, Serialize};
use shared_types::NodeId;
use std::fmt;

/// Why a proposer is reported for slashing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SlashReason {
    /// No Ringtail certificate arrived within the Quasar timeout.
    QuasarTimeout,
}

impl fmt::Display for SlashReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlashReason::QuasarTimeout => write!(f, "Quasar timeout: missing Ringtail certificate"),
        }
    }
}

/// Emitted on the bounded slash channel; never stored by the engine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlashEvent {
    pub proposer_id: NodeId,
    pub height: u64,
    pub reason: SlashReason,
    /// Unix seconds.
    pub timestamp: i64,
}

impl SlashEvent {
    pub fn quasar_timeout(proposer_id: NodeId, height: u64, timestamp: i64) -> Self {
        Self {
            proposer_id,
            height,
            reason: SlashReason::QuasarTimeout,
            timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_text() {
        let event = SlashEvent::quasar_timeout(NodeId([1; 20]), 4, 100);
        assert_eq!(
            event.reason.to_string(),
            "Quasar timeout: missing Ringtail certificate"
        );
        assert_eq!(event.height, 4);
    }
}
