//! Driven Ports (SPI - Outbound Dependencies)

use async_trait::async_trait;
use shared_types::{Block, BlockId, NodeId, BLS_AGGREGATE_LEN};

/// Application VM that builds, parses and stores blocks.
#[async_trait]
pub trait Vm: Send + Sync {
    /// Build a block on top of the current preference.
    async fn build_block(&self) -> Result<Block, String>;

    /// Decode a block received from the network.
    async fn parse_block(&self, bytes: &[u8]) -> Result<Block, String>;

    async fn get_block(&self, id: BlockId) -> Result<Block, String>;

    /// Application-level checks beyond `Block::verify`.
    async fn verify_with_context(&self, block: &Block) -> Result<(), String>;

    async fn last_accepted(&self) -> Result<BlockId, String>;

    /// Preferred tip for the next `build_block`.
    async fn set_preference(&self, id: BlockId) -> Result<(), String>;

    /// A block left consensus as accepted, quantum or rejected.
    async fn decided(&self, _block: &Block) -> Result<(), String> {
        Ok(())
    }
}

/// Network transport for consensus messages.
#[async_trait]
pub trait Sender: Send + Sync {
    async fn send_get_ancestors(
        &self,
        node_id: NodeId,
        request_id: u32,
        block_id: BlockId,
    ) -> Result<(), String>;

    async fn send_pull_query(
        &self,
        node_ids: &[NodeId],
        request_id: u32,
        block_id: BlockId,
    ) -> Result<(), String>;

    async fn send_push_query(
        &self,
        node_ids: &[NodeId],
        request_id: u32,
        container: &[u8],
    ) -> Result<(), String>;

    async fn send_chits(
        &self,
        node_id: NodeId,
        request_id: u32,
        preferred_id: BlockId,
        accepted_id: BlockId,
    ) -> Result<(), String>;

    async fn send_get(&self, node_id: NodeId, request_id: u32, block_id: BlockId)
        -> Result<(), String>;

    async fn send_put(&self, node_id: NodeId, request_id: u32, container: &[u8])
        -> Result<(), String>;

    async fn send_ancestors(
        &self,
        node_id: NodeId,
        request_id: u32,
        containers: &[Vec<u8>],
    ) -> Result<(), String>;

    async fn send_app_gossip(&self, payload: &[u8]) -> Result<(), String>;
}

/// BLS signing with the local key.
pub trait BlsSigner: Send + Sync {
    fn sign(&self, message: &[u8]) -> Result<[u8; BLS_AGGREGATE_LEN], String>;
}
