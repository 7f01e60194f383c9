//! Sender that records every outbound message.

use crate::domain::OutboundMessage;
use crate::ports::Sender;
use async_trait::async_trait;
use parking_lot::Mutex;
use shared_types::{BlockId, NodeId};
use std::sync::atomic::{AtomicBool, Ordering};

/// Keeps sent messages in order for inspection or relaying.
#[derive(Debug, Default)]
pub struct RecordingSender {
    messages: Mutex<Vec<OutboundMessage>>,
    fail: AtomicBool,
}

impl RecordingSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every send fail.
    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<OutboundMessage> {
        self.messages.lock().clone()
    }

    /// Drain recorded messages.
    pub fn take(&self) -> Vec<OutboundMessage> {
        std::mem::take(&mut *self.messages.lock())
    }

    pub fn len(&self) -> usize {
        self.messages.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.lock().is_empty()
    }

    fn record(&self, message: OutboundMessage) -> Result<(), String> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(format!("transport unavailable for {}", message.kind()));
        }
        self.messages.lock().push(message);
        Ok(())
    }
}

#[async_trait]
impl Sender for RecordingSender {
    async fn send_get_ancestors(
        &self,
        node_id: NodeId,
        request_id: u32,
        block_id: BlockId,
    ) -> Result<(), String> {
        self.record(OutboundMessage::GetAncestors {
            node_id,
            request_id,
            block_id,
        })
    }

    async fn send_pull_query(
        &self,
        node_ids: &[NodeId],
        request_id: u32,
        block_id: BlockId,
    ) -> Result<(), String> {
        self.record(OutboundMessage::PullQuery {
            node_ids: node_ids.to_vec(),
            request_id,
            block_id,
        })
    }

    async fn send_push_query(
        &self,
        node_ids: &[NodeId],
        request_id: u32,
        container: &[u8],
    ) -> Result<(), String> {
        self.record(OutboundMessage::PushQuery {
            node_ids: node_ids.to_vec(),
            request_id,
            container: container.to_vec(),
        })
    }

    async fn send_chits(
        &self,
        node_id: NodeId,
        request_id: u32,
        preferred_id: BlockId,
        accepted_id: BlockId,
    ) -> Result<(), String> {
        self.record(OutboundMessage::Chits {
            node_id,
            request_id,
            preferred_id,
            accepted_id,
        })
    }

    async fn send_get(
        &self,
        node_id: NodeId,
        request_id: u32,
        block_id: BlockId,
    ) -> Result<(), String> {
        self.record(OutboundMessage::Get {
            node_id,
            request_id,
            block_id,
        })
    }

    async fn send_put(
        &self,
        node_id: NodeId,
        request_id: u32,
        container: &[u8],
    ) -> Result<(), String> {
        self.record(OutboundMessage::Put {
            node_id,
            request_id,
            container: container.to_vec(),
        })
    }

    async fn send_ancestors(
        &self,
        node_id: NodeId,
        request_id: u32,
        containers: &[Vec<u8>],
    ) -> Result<(), String> {
        self.record(OutboundMessage::Ancestors {
            node_id,
            request_id,
            containers: containers.to_vec(),
        })
    }

    async fn send_app_gossip(&self, payload: &[u8]) -> Result<(), String> {
        self.record(OutboundMessage::AppGossip {
            payload: payload.to_vec(),
        })
    }
}
