//! In-memory application VM.

use crate::ports::Vm;
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use shared_types::{Block, BlockId, NodeId, Status, TimeSource};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Keeps every block it has seen in a map and builds on the preference.
pub struct InMemoryVm {
    proposer: NodeId,
    time: Arc<dyn TimeSource>,
    blocks: RwLock<HashMap<BlockId, Block>>,
    last_accepted: RwLock<BlockId>,
    preference: RwLock<BlockId>,
    mempool: Mutex<Vec<Vec<u8>>>,
    fail_build: AtomicBool,
}

impl InMemoryVm {
    /// Start from an accepted genesis (or any accepted anchor).
    pub fn new(proposer: NodeId, anchor: Block, time: Arc<dyn TimeSource>) -> Self {
        let id = anchor.id();
        let mut blocks = HashMap::new();
        blocks.insert(id, anchor);
        Self {
            proposer,
            time,
            blocks: RwLock::new(blocks),
            last_accepted: RwLock::new(id),
            preference: RwLock::new(id),
            mempool: Mutex::new(Vec::new()),
            fail_build: AtomicBool::new(false),
        }
    }

    /// Queue a transaction for the next built block.
    pub fn submit_transaction(&self, tx: Vec<u8>) {
        self.mempool.lock().push(tx);
    }

    pub fn set_fail_build(&self, fail: bool) {
        self.fail_build.store(fail, Ordering::SeqCst);
    }

    pub fn block(&self, id: &BlockId) -> Option<Block> {
        self.blocks.read().get(id).cloned()
    }

    pub fn preference(&self) -> BlockId {
        *self.preference.read()
    }

    pub fn last_accepted_id(&self) -> BlockId {
        *self.last_accepted.read()
    }

    pub fn len(&self) -> usize {
        self.blocks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.read().is_empty()
    }
}

#[async_trait]
impl Vm for InMemoryVm {
    async fn build_block(&self) -> Result<Block, String> {
        if self.fail_build.load(Ordering::SeqCst) {
            return Err("build disabled".into());
        }
        let parent_id = self.preference();
        let parent_height = self
            .blocks
            .read()
            .get(&parent_id)
            .map(Block::height)
            .ok_or_else(|| format!("preferred block {parent_id} unknown"))?;
        let txs = std::mem::take(&mut *self.mempool.lock());
        let block = Block::new(
            parent_id,
            parent_height + 1,
            self.time.now(),
            self.proposer,
            txs,
        );
        self.blocks.write().insert(block.id(), block.clone());
        Ok(block)
    }

    async fn parse_block(&self, bytes: &[u8]) -> Result<Block, String> {
        let block = Block::parse(bytes).map_err(|e| e.to_string())?;
        self.blocks
            .write()
            .entry(block.id())
            .or_insert_with(|| block.clone());
        Ok(block)
    }

    async fn get_block(&self, id: BlockId) -> Result<Block, String> {
        self.block(&id).ok_or_else(|| format!("block {id} not found"))
    }

    async fn verify_with_context(&self, block: &Block) -> Result<(), String> {
        if block.height() == 0 {
            return Ok(());
        }
        let blocks = self.blocks.read();
        let parent = blocks
            .get(&block.parent_id())
            .ok_or_else(|| format!("parent {} unknown", block.parent_id()))?;
        if block.height() != parent.height() + 1 {
            return Err(format!(
                "height {} does not follow parent height {}",
                block.height(),
                parent.height()
            ));
        }
        if block.timestamp() < parent.timestamp() {
            return Err("timestamp precedes parent".into());
        }
        Ok(())
    }

    async fn last_accepted(&self) -> Result<BlockId, String> {
        Ok(self.last_accepted_id())
    }

    async fn set_preference(&self, id: BlockId) -> Result<(), String> {
        *self.preference.write() = id;
        Ok(())
    }

    async fn decided(&self, block: &Block) -> Result<(), String> {
        let id = block.id();
        if matches!(block.status(), Status::Accepted | Status::Quantum) {
            *self.last_accepted.write() = id;
        }
        self.blocks.write().insert(id, block.clone());
        Ok(())
    }
}
