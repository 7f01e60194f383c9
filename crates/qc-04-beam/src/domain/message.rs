//! # Engine Messages
//!
//! Inbound consensus messages consumed by the message loop, outbound
//! messages drained by the sender task, and the gossip encoding of a
//! certificate share.
//!
//! ## Share Gossip Layout (little-endian)
//!
//! ```text
//! height      u64
//! node_id     20 bytes
//! message     32 bytes   (block signing digest)
//! share_len   u32
//! share       share_len bytes
//! ```

use shared_types::{BlockId, CodecError, NodeId, BLOCK_ID_LEN, NODE_ID_LEN};

/// Inbound consensus message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// Peer asks for a block and its ancestors.
    GetAncestors {
        node_id: NodeId,
        request_id: u32,
        block_id: BlockId,
    },
    /// Peer polls our preference for a block it names by id.
    PullQuery {
        node_id: NodeId,
        request_id: u32,
        block_id: BlockId,
    },
    /// Peer polls our preference and ships the block.
    PushQuery {
        node_id: NodeId,
        request_id: u32,
        container: Vec<u8>,
    },
    /// Vote answering one of our polls.
    Chits {
        node_id: NodeId,
        request_id: u32,
        preferred_id: BlockId,
        accepted_id: BlockId,
    },
    /// Peer will not answer one of our polls.
    QueryFailed { node_id: NodeId, request_id: u32 },
    /// Peer asks for a single block.
    Get {
        node_id: NodeId,
        request_id: u32,
        block_id: BlockId,
    },
    /// Reply to our `Get`.
    Put {
        node_id: NodeId,
        request_id: u32,
        container: Vec<u8>,
    },
    /// Reply to our `GetAncestors`, newest block first.
    Ancestors {
        node_id: NodeId,
        request_id: u32,
        containers: Vec<Vec<u8>>,
    },
    /// Remote Ringtail share.
    Share {
        node_id: NodeId,
        height: u64,
        share: Vec<u8>,
    },
}

impl Message {
    pub fn kind(&self) -> &'static str {
        match self {
            Message::GetAncestors { .. } => "get_ancestors",
            Message::PullQuery { .. } => "pull_query",
            Message::PushQuery { .. } => "push_query",
            Message::Chits { .. } => "chits",
            Message::QueryFailed { .. } => "query_failed",
            Message::Get { .. } => "get",
            Message::Put { .. } => "put",
            Message::Ancestors { .. } => "ancestors",
            Message::Share { .. } => "share",
        }
    }

    pub fn node_id(&self) -> NodeId {
        match self {
            Message::GetAncestors { node_id, .. }
            | Message::PullQuery { node_id, .. }
            | Message::PushQuery { node_id, .. }
            | Message::Chits { node_id, .. }
            | Message::QueryFailed { node_id, .. }
            | Message::Get { node_id, .. }
            | Message::Put { node_id, .. }
            | Message::Ancestors { node_id, .. }
            | Message::Share { node_id, .. } => *node_id,
        }
    }

    /// Share message carried by a decoded gossip payload.
    pub fn from_gossip(payload: &[u8]) -> Result<Self, CodecError> {
        let gossip = ShareGossip::decode(payload)?;
        Ok(Message::Share {
            node_id: gossip.node_id,
            height: gossip.height,
            share: gossip.share,
        })
    }
}

/// Outbound message handed to the `Sender` port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundMessage {
    GetAncestors {
        node_id: NodeId,
        request_id: u32,
        block_id: BlockId,
    },
    PullQuery {
        node_ids: Vec<NodeId>,
        request_id: u32,
        block_id: BlockId,
    },
    PushQuery {
        node_ids: Vec<NodeId>,
        request_id: u32,
        container: Vec<u8>,
    },
    Chits {
        node_id: NodeId,
        request_id: u32,
        preferred_id: BlockId,
        accepted_id: BlockId,
    },
    Get {
        node_id: NodeId,
        request_id: u32,
        block_id: BlockId,
    },
    Put {
        node_id: NodeId,
        request_id: u32,
        container: Vec<u8>,
    },
    Ancestors {
        node_id: NodeId,
        request_id: u32,
        containers: Vec<Vec<u8>>,
    },
    AppGossip { payload: Vec<u8> },
}

impl OutboundMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            OutboundMessage::GetAncestors { .. } => "get_ancestors",
            OutboundMessage::PullQuery { .. } => "pull_query",
            OutboundMessage::PushQuery { .. } => "push_query",
            OutboundMessage::Chits { .. } => "chits",
            OutboundMessage::Get { .. } => "get",
            OutboundMessage::Put { .. } => "put",
            OutboundMessage::Ancestors { .. } => "ancestors",
            OutboundMessage::AppGossip { .. } => "app_gossip",
        }
    }
}

/// A Ringtail share as gossiped between validators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareGossip {
    pub height: u64,
    pub node_id: NodeId,
    /// Block signing digest the share covers.
    pub message: [u8; BLOCK_ID_LEN],
    pub share: Vec<u8>,
}

impl ShareGossip {
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(8 + NODE_ID_LEN + BLOCK_ID_LEN + 4 + self.share.len());
        out.extend_from_slice(&self.height.to_le_bytes());
        out.extend_from_slice(self.node_id.as_bytes());
        out.extend_from_slice(&self.message);
        out.extend_from_slice(&(self.share.len() as u32).to_le_bytes());
        out.extend_from_slice(&self.share);
        out
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        let mut rest = bytes;
        let height = u64::from_le_bytes(take_array(&mut rest, "height")?);
        let node_id = NodeId(take_array(&mut rest, "node_id")?);
        let message = take_array(&mut rest, "message")?;
        let share_len = u32::from_le_bytes(take_array(&mut rest, "share_len")?) as usize;
        let share = take(&mut rest, share_len, "share")?.to_vec();
        if !rest.is_empty() {
            return Err(CodecError::TrailingBytes(rest.len()));
        }
        Ok(Self {
            height,
            node_id,
            message,
            share,
        })
    }
}

fn take<'a>(rest: &mut &'a [u8], n: usize, field: &'static str) -> Result<&'a [u8], CodecError> {
    if rest.len() < n {
        return Err(CodecError::Truncated {
            field,
            needed: n,
            remaining: rest.len(),
        });
    }
    let (head, tail) = rest.split_at(n);
    *rest = tail;
    Ok(head)
}

fn take_array<const N: usize>(
    rest: &mut &[u8],
    field: &'static str,
) -> Result<[u8; N], CodecError> {
    let mut out = [0u8; N];
    out.copy_from_slice(take(rest, N, field)?);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gossip() -> ShareGossip {
        ShareGossip {
            height: 12,
            node_id: NodeId([4; 20]),
            message: [9; 32],
            share: vec![1, 2, 3, 4, 5],
        }
    }

    #[test]
    fn test_share_gossip_layout() {
        let bytes = gossip().encode();
        assert_eq!(bytes.len(), 8 + 20 + 32 + 4 + 5);
        assert_eq!(&bytes[..8], &12u64.to_le_bytes());
        assert_eq!(ShareGossip::decode(&bytes).unwrap(), gossip());
    }

    #[test]
    fn test_share_gossip_truncated() {
        let bytes = gossip().encode();
        let err = ShareGossip::decode(&bytes[..bytes.len() - 1]).unwrap_err();
        assert!(matches!(
            err,
            CodecError::Truncated {
                field: "share",
                needed: 5,
                remaining: 4
            }
        ));
    }

    #[test]
    fn test_share_gossip_trailing() {
        let mut bytes = gossip().encode();
        bytes.push(0);
        assert_eq!(
            ShareGossip::decode(&bytes),
            Err(CodecError::TrailingBytes(1))
        );
    }

    #[test]
    fn test_oversized_share_len_does_not_allocate() {
        let mut bytes = gossip().encode();
        bytes[60..64].copy_from_slice(&u32::MAX.to_le_bytes());
        assert!(matches!(
            ShareGossip::decode(&bytes),
            Err(CodecError::Truncated { field: "share", .. })
        ));
    }

    #[test]
    fn test_message_from_gossip() {
        let message = Message::from_gossip(&gossip().encode()).unwrap();
        assert_eq!(message.kind(), "share");
        assert_eq!(message.node_id(), NodeId([4; 20]));
        assert!(matches!(message, Message::Share { height: 12, .. }));
    }
}
