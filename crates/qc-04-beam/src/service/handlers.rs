//! Inbound message handlers.
//!
//! Every handler returns an error instead of panicking; the message loop
//! logs it and moves on.

use super::{bump, EngineInner};
use crate::domain::{Message, OutboundMessage};
use crate::error::{EngineError, EngineResult};
use qc_01_poll::{PollResult, Vote};
use shared_types::{Block, BlockId, NodeId, Status};
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Most blocks returned in one `Ancestors` reply.
const MAX_ANCESTORS: usize = 128;

impl EngineInner {
    pub(super) async fn handle_message(&self, message: Message) -> EngineResult<()> {
        match message {
            Message::GetAncestors {
                node_id,
                request_id,
                block_id,
            } => self.on_get_ancestors(node_id, request_id, block_id).await,
            Message::PullQuery {
                node_id,
                request_id,
                block_id,
            } => self.on_pull_query(node_id, request_id, block_id).await,
            Message::PushQuery {
                node_id,
                request_id,
                container,
            } => self.on_push_query(node_id, request_id, container).await,
            Message::Chits {
                node_id,
                request_id,
                preferred_id,
                accepted_id,
            } => {
                self.on_chits(node_id, request_id, preferred_id, accepted_id)
                    .await
            }
            Message::QueryFailed {
                node_id,
                request_id,
            } => self.on_query_failed(node_id, request_id).await,
            Message::Get {
                node_id,
                request_id,
                block_id,
            } => self.on_get(node_id, request_id, block_id).await,
            Message::Put {
                node_id, container, ..
            } => self.on_put(node_id, container).await,
            Message::Ancestors {
                node_id,
                containers,
                ..
            } => self.on_ancestors(node_id, containers).await,
            Message::Share {
                node_id,
                height,
                share,
            } => self.on_share(node_id, height, share),
        }
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    async fn on_push_query(
        &self,
        node_id: NodeId,
        request_id: u32,
        container: Vec<u8>,
    ) -> EngineResult<()> {
        let admitted = match self.vm.parse_block(&container).await {
            Ok(block) => self.admit(node_id, block).await,
            Err(e) => Err(EngineError::Vm(e)),
        };
        self.reply_chits(node_id, request_id);
        admitted
    }

    async fn on_pull_query(
        &self,
        node_id: NodeId,
        request_id: u32,
        block_id: BlockId,
    ) -> EngineResult<()> {
        if !self.is_known(&block_id) {
            match self.vm.get_block(block_id).await {
                Ok(block) => {
                    if let Err(e) = self.admit(node_id, block).await {
                        debug!(block = %block_id, error = %e, "Queried block not admitted");
                    }
                }
                Err(_) => self.request_block(node_id, block_id),
            }
        }
        self.reply_chits(node_id, request_id);
        Ok(())
    }

    fn reply_chits(&self, node_id: NodeId, request_id: u32) {
        let (preferred_id, accepted_id) = {
            let store = self.store.lock();
            (store.preference(), store.last_accepted())
        };
        self.enqueue(OutboundMessage::Chits {
            node_id,
            request_id,
            preferred_id,
            accepted_id,
        });
    }

    // =========================================================================
    // VOTES
    // =========================================================================

    async fn on_chits(
        &self,
        node_id: NodeId,
        request_id: u32,
        preferred_id: BlockId,
        accepted_id: BlockId,
    ) -> EngineResult<()> {
        if !self.is_known(&preferred_id) {
            self.request_block(node_id, preferred_id);
        }
        let finished =
            self.polls
                .vote(request_id, node_id, Vote::new(preferred_id, accepted_id))?;
        if finished {
            self.complete_poll(request_id).await?;
        }
        Ok(())
    }

    async fn on_query_failed(&self, node_id: NodeId, request_id: u32) -> EngineResult<()> {
        if self.polls.drop_voter(request_id, &node_id)? {
            self.complete_poll(request_id).await?;
        }
        Ok(())
    }

    async fn complete_poll(&self, request_id: u32) -> EngineResult<()> {
        match self.polls.remove(request_id)? {
            Some(result) => self.apply_poll(request_id, result).await,
            None => Ok(()),
        }
    }

    /// Feed a finished poll into consensus and publish what it decided.
    async fn apply_poll(&self, request_id: u32, result: PollResult) -> EngineResult<()> {
        let alpha_confidence = self.config.params.alpha_confidence;
        if result.preference_count < alpha_confidence {
            bump(&self.counters.polls_below_alpha);
            debug!(
                request_id,
                preferred = %result.preferred_id,
                votes = result.preference_count,
                alpha_confidence,
                "Poll below alpha confidence, not recorded"
            );
            return Ok(());
        }

        let votes = vec![result.preferred_id; result.preference_count];
        let (decided, dropped, preference) = {
            let mut store = self.store.lock();
            store.record_poll(&votes)?;
            (
                store.take_decided(),
                store.take_dropped_orphans(),
                store.preference(),
            )
        };
        bump(&self.counters.polls_applied);
        self.forget_orphans(&dropped);

        self.finish_decided(decided).await;
        self.vm
            .set_preference(preference)
            .await
            .map_err(EngineError::Vm)
    }

    async fn finish_decided(&self, decided: Vec<Block>) {
        for mut block in decided {
            let id = block.id();
            let height = block.height();
            match block.status() {
                Status::Accepted => {
                    bump(&self.counters.blocks_accepted);
                    if let Some(quasar) = &self.quasar {
                        if block.has_dual_cert() {
                            match block.set_quantum() {
                                Ok(()) => {
                                    bump(&self.counters.blocks_quantum);
                                    info!(block = %id, height, "Block reached quantum finality");
                                }
                                Err(e) => {
                                    warn!(block = %id, error = %e, "Quantum promotion failed")
                                }
                            }
                        }
                        quasar.prune_below(height + 1);
                    }
                }
                Status::Rejected => bump(&self.counters.blocks_rejected),
                Status::Processing | Status::Quantum => {}
            }
            if let Err(e) = self.vm.decided(&block).await {
                warn!(block = %id, error = %e, "VM failed to record decision");
            }
        }
    }

    // =========================================================================
    // BLOCK TRANSFER
    // =========================================================================

    async fn on_get(&self, node_id: NodeId, request_id: u32, block_id: BlockId) -> EngineResult<()> {
        let block = self
            .find_block(block_id)
            .await
            .ok_or(EngineError::UnknownBlock(block_id))?;
        self.enqueue(OutboundMessage::Put {
            node_id,
            request_id,
            container: block.encode(),
        });
        Ok(())
    }

    async fn on_put(&self, node_id: NodeId, container: Vec<u8>) -> EngineResult<()> {
        let block = self
            .vm
            .parse_block(&container)
            .await
            .map_err(EngineError::Vm)?;
        self.admit(node_id, block).await
    }

    async fn on_get_ancestors(
        &self,
        node_id: NodeId,
        request_id: u32,
        block_id: BlockId,
    ) -> EngineResult<()> {
        let mut containers = Vec::new();
        let mut next = block_id;
        while containers.len() < MAX_ANCESTORS {
            let Some(block) = self.find_block(next).await else {
                break;
            };
            containers.push(block.encode());
            if block.height() == 0 {
                break;
            }
            next = block.parent_id();
        }
        if containers.is_empty() {
            return Err(EngineError::UnknownBlock(block_id));
        }
        debug!(block = %block_id, count = containers.len(), "Serving ancestors");
        self.enqueue(OutboundMessage::Ancestors {
            node_id,
            request_id,
            containers,
        });
        Ok(())
    }

    /// Containers arrive newest first; admit oldest first.
    async fn on_ancestors(&self, node_id: NodeId, containers: Vec<Vec<u8>>) -> EngineResult<()> {
        let mut failures = 0usize;
        for container in containers.iter().rev() {
            let admitted = match self.vm.parse_block(container).await {
                Ok(block) => self.admit(node_id, block).await,
                Err(e) => Err(EngineError::Vm(e)),
            };
            if let Err(e) = admitted {
                failures += 1;
                debug!(node = %node_id, error = %e, "Ancestor not admitted");
            }
        }
        debug!(node = %node_id, received = containers.len(), failures, "Ancestors processed");
        Ok(())
    }

    fn on_share(&self, node_id: NodeId, height: u64, share: Vec<u8>) -> EngineResult<()> {
        let quasar = self.quasar.as_ref().ok_or(EngineError::QuasarDisabled)?;
        quasar.on_share(height, node_id, share)?;
        Ok(())
    }

    // =========================================================================
    // ADMISSION
    // =========================================================================

    /// Verify a network block and issue it into consensus.
    ///
    /// A block whose parent is not yet processing is tracked as an orphan
    /// and its ancestors are requested from the sender.
    async fn admit(&self, from: NodeId, block: Block) -> EngineResult<()> {
        let id = block.id();
        let parent_id = block.parent_id();
        let (known, parent_ready) = {
            let store = self.store.lock();
            (
                id == store.last_accepted() || store.get(&id).is_some(),
                parent_id == store.last_accepted() || store.processing(&parent_id),
            )
        };
        if known {
            return Ok(());
        }

        if let Some(quasar) = &self.quasar {
            quasar.verify_dual_certificates(
                &block,
                &self.identity.bls_public_key,
                &self.identity.ringtail_public_key,
            )?;
        }

        if !parent_ready {
            let tracked = {
                let mut store = self.store.lock();
                store.add(block)?;
                store.get(&id).is_some()
            };
            if !tracked {
                return Ok(());
            }
            self.pending.lock().entry(parent_id).or_default().push(id);
            let request_id = self.next_request_id();
            self.enqueue(OutboundMessage::GetAncestors {
                node_id: from,
                request_id,
                block_id: parent_id,
            });
            debug!(block = %id, parent = %parent_id, "Parent unknown, requesting ancestors");
            return Ok(());
        }

        self.vm
            .verify_with_context(&block)
            .await
            .map_err(EngineError::Vm)?;
        self.store.lock().add(block)?;
        self.promote_pending(id).await;
        Ok(())
    }

    /// Re-issue orphans that were waiting on `parent`, transitively.
    async fn promote_pending(&self, parent: BlockId) {
        let mut ready = vec![parent];
        while let Some(parent) = ready.pop() {
            let children = self.pending.lock().remove(&parent).unwrap_or_default();
            for child_id in children {
                let Some(child) = self.store.lock().get(&child_id).cloned() else {
                    continue;
                };
                if let Err(e) = self.vm.verify_with_context(&child).await {
                    debug!(block = %child_id, error = %e, "Orphan failed VM verification");
                    continue;
                }
                let (promoted, dropped) = {
                    let mut store = self.store.lock();
                    let promoted = match store.add(child) {
                        Ok(()) => store.processing(&child_id),
                        Err(e) => {
                            debug!(block = %child_id, error = %e, "Orphan re-add failed");
                            false
                        }
                    };
                    (promoted, store.take_dropped_orphans())
                };
                self.forget_orphans(&dropped);
                if promoted {
                    debug!(block = %child_id, parent = %parent, "Orphan promoted");
                    ready.push(child_id);
                }
            }
        }
    }

    /// Stop waiting on parents for orphans the store has evicted.
    fn forget_orphans(&self, dropped: &[BlockId]) {
        if dropped.is_empty() {
            return;
        }
        let dropped: HashSet<&BlockId> = dropped.iter().collect();
        self.pending.lock().retain(|_, children| {
            children.retain(|c| !dropped.contains(c));
            !children.is_empty()
        });
        debug!(count = dropped.len(), "Forgot evicted orphans");
    }

    fn request_block(&self, node_id: NodeId, block_id: BlockId) {
        let request_id = self.next_request_id();
        self.enqueue(OutboundMessage::Get {
            node_id,
            request_id,
            block_id,
        });
    }

    fn is_known(&self, id: &BlockId) -> bool {
        let store = self.store.lock();
        *id == store.last_accepted() || store.get(id).is_some()
    }

    /// Tracked copy first (it may carry certificates), then the VM.
    async fn find_block(&self, id: BlockId) -> Option<Block> {
        let tracked = self.store.lock().get(&id).cloned();
        match tracked {
            Some(block) => Some(block),
            None => self.vm.get_block(id).await.ok(),
        }
    }
}
