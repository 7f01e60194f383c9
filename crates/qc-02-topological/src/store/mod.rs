//! # Topological Consensus Store
//!
//! Tracks undecided blocks as a tree rooted at the last accepted block,
//! turns poll results into a preference, accumulates confidence along the
//! preferred path and decides blocks once confidence reaches Beta.
//!
//! ## Poll Processing
//!
//! ```text
//! votes ──bubble to ancestors──→ counts per block
//!        ──max per height (≥ α_p)──→ height preferences
//!        ──highest anchored──→ preference (reset confidence on change)
//!        ──+1 along path──→ confidence
//!        ──≥ β, oldest first──→ accept (reject same-height conflicts)
//! ```
//!
//! ## Single Writer
//!
//! The store has no internal locking. The engine owns it behind one mutex.

use crate::domain::{Arena, ConsensusBlock, Handle, Node, Parent};
use crate::error::{ConsensusError, ConsensusResult};
use crate::metrics;
use crate::params::Parameters;
use shared_types::{BlockError, BlockId, SystemTimeSource, TimeSource};
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Health snapshot of the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthReport {
    pub processing: usize,
    pub preference: BlockId,
    pub finalized: bool,
    /// Finalized, or processing at most `optimal_processing` blocks.
    pub healthy: bool,
}

/// Lifetime counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsensusStats {
    pub polls: u64,
    pub accepted: u64,
    pub rejected: u64,
    pub failed_accepts: u64,
    pub failed_rejects: u64,
    pub orphans: u64,
    pub stale_dropped: u64,
}

/// Metastable consensus over a block tree.
pub struct Topological<B: ConsensusBlock> {
    initialized: bool,
    params: Parameters,
    time: Arc<dyn TimeSource>,

    arena: Arena<B>,
    heights: BTreeMap<u64, Vec<Handle>>,
    processing: HashSet<BlockId>,

    preference: BlockId,
    last_accepted: BlockId,
    last_accepted_height: u64,
    last_accepted_time: i64,
    finalized: bool,

    decided: Vec<B>,
    dropped_orphans: Vec<BlockId>,
    stats: ConsensusStats,
}

impl<B: ConsensusBlock> Default for Topological<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: ConsensusBlock> Topological<B> {
    pub fn new() -> Self {
        Self::with_time_source(Arc::new(SystemTimeSource))
    }

    pub fn with_time_source(time: Arc<dyn TimeSource>) -> Self {
        Self {
            initialized: false,
            params: Parameters::default(),
            time,
            arena: Arena::new(),
            heights: BTreeMap::new(),
            processing: HashSet::new(),
            preference: BlockId::EMPTY,
            last_accepted: BlockId::EMPTY,
            last_accepted_height: 0,
            last_accepted_time: 0,
            finalized: false,
            decided: Vec::new(),
            dropped_orphans: Vec::new(),
            stats: ConsensusStats::default(),
        }
    }

    /// Anchor the store at the last accepted block. Callable once.
    pub fn initialize(
        &mut self,
        params: Parameters,
        last_accepted_id: BlockId,
        last_accepted_height: u64,
        last_accepted_time: i64,
    ) -> ConsensusResult<()> {
        if self.initialized {
            return Err(ConsensusError::AlreadyInitialized);
        }
        params.validate()?;

        self.params = params;
        self.arena = Arena::new();
        self.heights.clear();
        self.processing.clear();
        self.decided.clear();
        self.dropped_orphans.clear();
        self.preference = last_accepted_id;
        self.last_accepted = last_accepted_id;
        self.last_accepted_height = last_accepted_height;
        self.last_accepted_time = last_accepted_time;
        self.finalized = true;
        self.initialized = true;

        info!(
            anchor = %last_accepted_id,
            height = last_accepted_height,
            k = params.k,
            beta = params.beta,
            "Topological consensus initialized"
        );
        Ok(())
    }

    // =========================================================================
    // ADD
    // =========================================================================

    /// Issue a block into consensus.
    ///
    /// Re-adding a tracked block is a no-op, except that a block still
    /// waiting for its parent is promoted once the parent is known.
    ///
    /// A block with a known parent must sit exactly one height above it and
    /// must not predate it. An orphan is checked when it is promoted, and is
    /// dropped if the check fails.
    pub fn add(&mut self, block: B) -> ConsensusResult<()> {
        self.ensure_initialized()?;

        let id = block.id();
        if id == self.last_accepted {
            return Ok(());
        }
        if let Some(handle) = self.arena.handle(&id) {
            return self.try_promote(handle);
        }

        block.verify(self.time.now())?;

        let height = block.height();
        if height <= self.last_accepted_height {
            debug!(block = %id, height, anchor_height = self.last_accepted_height, "Dropping block at or below anchor");
            self.stats.stale_dropped += 1;
            return Ok(());
        }

        let parent_id = block.parent();
        let parent = self.resolve_parent(parent_id);
        if let Some(parent) = parent {
            self.check_linkage(height, block.timestamp(), parent)?;
        }

        let handle = self.arena.insert(Node::new(block, id, height, parent_id));
        match parent {
            Some(parent) => self.activate(handle, parent),
            None => {
                self.stats.orphans += 1;
                debug!(block = %id, parent = %parent_id, height, "Block stored as orphan");
            }
        }
        Ok(())
    }

    fn resolve_parent(&self, parent_id: BlockId) -> Option<Parent> {
        if parent_id == self.last_accepted {
            return Some(Parent::Detached(parent_id));
        }
        let handle = self.arena.handle(&parent_id)?;
        let parent = self.arena.get(handle)?;
        parent.processing.then_some(Parent::Tracked(handle))
    }

    fn try_promote(&mut self, handle: Handle) -> ConsensusResult<()> {
        let (parent_id, height, timestamp) = match self.arena.get(handle) {
            Some(node) if !node.processing => match node.parent {
                Parent::Detached(id) => (id, node.height, node.block.timestamp()),
                Parent::Tracked(_) => return Ok(()),
            },
            _ => return Ok(()),
        };
        let Some(parent) = self.resolve_parent(parent_id) else {
            return Ok(());
        };

        self.stats.orphans = self.stats.orphans.saturating_sub(1);
        if let Err(e) = self.check_linkage(height, timestamp, parent) {
            // Orphans never have linked children, so removal is local.
            if let Some(node) = self.arena.remove(handle) {
                debug!(block = %node.id, error = %e, "Orphan does not extend its parent, dropped");
                self.dropped_orphans.push(node.id);
            }
            return Err(e.into());
        }
        self.activate(handle, parent);
        Ok(())
    }

    /// Height and timestamp of a resolved parent.
    fn parent_position(&self, parent: Parent) -> Option<(u64, i64)> {
        match parent {
            Parent::Detached(_) => Some((self.last_accepted_height, self.last_accepted_time)),
            Parent::Tracked(p) => self.arena.get(p).map(|n| (n.height, n.block.timestamp())),
        }
    }

    fn check_linkage(&self, height: u64, timestamp: i64, parent: Parent) -> Result<(), BlockError> {
        let Some((parent_height, parent_timestamp)) = self.parent_position(parent) else {
            return Ok(());
        };
        if parent_height.checked_add(1) != Some(height) {
            return Err(BlockError::HeightMismatch {
                height,
                parent_height,
            });
        }
        if timestamp < parent_timestamp {
            return Err(BlockError::TimestampBeforeParent {
                timestamp,
                parent_timestamp,
            });
        }
        Ok(())
    }

    fn activate(&mut self, handle: Handle, parent: Parent) {
        self.arena.link(handle, parent);
        let Some(node) = self.arena.get_mut(handle) else {
            return;
        };
        node.processing = true;
        let (id, height) = (node.id, node.height);
        let parent_id = match parent {
            Parent::Detached(pid) => pid,
            Parent::Tracked(p) => self.arena.get(p).map(|n| n.id).unwrap_or_default(),
        };

        self.heights.entry(height).or_default().push(handle);
        self.processing.insert(id);
        self.finalized = false;

        if parent_id == self.preference {
            self.preference = id;
        }

        metrics::set_processing(self.processing.len());
        debug!(block = %id, parent = %parent_id, height, "Block added to processing");
    }

    // =========================================================================
    // RECORD POLL
    // =========================================================================

    /// Apply one poll's votes. Unknown or decided ids are ignored.
    pub fn record_poll(&mut self, votes: &[BlockId]) -> ConsensusResult<()> {
        self.ensure_initialized()?;
        self.stats.polls += 1;
        metrics::record_poll();

        let counts = self.bubble_votes(votes);
        let height_preferences = self.height_preferences(&counts);

        let mut preference = self.preference;
        for (handle, _) in height_preferences.values().rev() {
            if self.is_anchored(*handle) {
                if let Some(node) = self.arena.get(*handle) {
                    preference = node.id;
                }
                break;
            }
        }

        if preference != self.preference {
            for node in self.arena.nodes_mut() {
                node.confidence = 0;
            }
            debug!(old = %self.preference, new = %preference, "Preference changed");
            self.preference = preference;
        }

        let path = self.preferred_path();
        for handle in &path {
            if let Some(node) = self.arena.get_mut(*handle) {
                node.confidence += 1;
            }
        }

        self.accept_confident(&path);
        self.finalized = self.processing.is_empty();
        metrics::set_processing(self.processing.len());
        Ok(())
    }

    /// Count each vote for its block and every tracked ancestor.
    fn bubble_votes(&self, votes: &[BlockId]) -> HashMap<Handle, usize> {
        let mut counts: HashMap<Handle, usize> = HashMap::new();
        for vote in votes {
            let Some(start) = self.arena.handle(vote) else {
                continue;
            };
            if !self.arena.get(start).is_some_and(|n| n.processing) {
                continue;
            }
            for handle in self.arena.path(start) {
                *counts.entry(handle).or_default() += 1;
            }
        }
        counts
    }

    /// Per height, the block with the most votes at or above α_p.
    /// Equal counts resolve to the lowest id.
    fn height_preferences(&self, counts: &HashMap<Handle, usize>) -> BTreeMap<u64, (Handle, usize)> {
        let mut best: BTreeMap<u64, (Handle, usize)> = BTreeMap::new();
        for (&handle, &count) in counts {
            if count < self.params.alpha_preference {
                continue;
            }
            let Some(node) = self.arena.get(handle) else {
                continue;
            };
            match best.entry(node.height) {
                Entry::Vacant(e) => {
                    e.insert((handle, count));
                }
                Entry::Occupied(mut e) => {
                    let (current, current_count) = *e.get();
                    let current_id = self.arena.get(current).map(|n| n.id);
                    if count > current_count
                        || (count == current_count && Some(node.id) < current_id)
                    {
                        e.insert((handle, count));
                    }
                }
            }
        }
        best
    }

    /// Whether the tracked ancestry of `handle` ends at the anchor.
    fn is_anchored(&self, handle: Handle) -> bool {
        self.arena.root(handle) == Some(self.last_accepted)
    }

    /// Handles from the preference down to (excluding) the anchor.
    fn preferred_path(&self) -> Vec<Handle> {
        match self.arena.handle(&self.preference) {
            Some(handle) if self.is_anchored(handle) => self.arena.path(handle).collect(),
            _ => Vec::new(),
        }
    }

    // =========================================================================
    // ACCEPT / REJECT
    // =========================================================================

    /// Accept, oldest first, every path block up to the newest one whose
    /// confidence reached β. Stops at the first failed accept callback.
    fn accept_confident(&mut self, path: &[Handle]) {
        let beta = self.params.beta;
        let newest = path.iter().position(|h| {
            self.arena
                .get(*h)
                .is_some_and(|n| n.confidence >= beta)
        });
        let Some(newest) = newest else {
            return;
        };
        for handle in path[newest..].iter().rev() {
            if !self.accept_block(*handle) {
                break;
            }
        }
    }

    fn accept_block(&mut self, handle: Handle) -> bool {
        let Some(node) = self.arena.get_mut(handle) else {
            return false;
        };
        if let Err(e) = node.block.accept() {
            warn!(block = %node.id, height = node.height, error = %e, "Block accept callback failed");
            self.stats.failed_accepts += 1;
            metrics::record_failed_accept();
            return false;
        }
        let (id, height, timestamp) = (node.id, node.height, node.block.timestamp());

        self.processing.remove(&id);
        self.last_accepted = id;
        self.last_accepted_height = height;
        self.last_accepted_time = timestamp;

        if let Some(node) = self.detach(handle) {
            self.decided.push(node.block);
        }
        self.stats.accepted += 1;
        metrics::record_accepted();
        info!(block = %id, height, "Block accepted");

        let conflicts: Vec<Handle> = self.heights.get(&height).cloned().unwrap_or_default();
        for conflict in conflicts {
            self.reject_subtree(conflict);
        }
        self.drop_stale_orphans(height);
        true
    }

    /// Orphans at or below the anchor height can never be linked.
    fn drop_stale_orphans(&mut self, anchor_height: u64) {
        let stale: Vec<Handle> = self
            .arena
            .iter()
            .filter(|(_, n)| !n.processing && n.height <= anchor_height)
            .map(|(h, _)| h)
            .collect();
        for handle in stale {
            let Some(node) = self.arena.remove(handle) else {
                continue;
            };
            debug!(block = %node.id, height = node.height, anchor_height, "Stale orphan dropped");
            self.stats.orphans = self.stats.orphans.saturating_sub(1);
            self.stats.stale_dropped += 1;
            self.dropped_orphans.push(node.id);
        }
    }

    /// Reject `root` and every descendant. A failed reject leaves that block
    /// processing but its children are still rejected.
    fn reject_subtree(&mut self, root: Handle) {
        let mut stack = vec![root];
        while let Some(handle) = stack.pop() {
            let Some(node) = self.arena.get_mut(handle) else {
                continue;
            };
            node.confidence = 0;
            stack.extend(node.children.iter().copied());
            let id = node.id;

            match node.block.reject() {
                Ok(()) => {
                    self.processing.remove(&id);
                    if let Some(node) = self.detach(handle) {
                        self.decided.push(node.block);
                    }
                    self.stats.rejected += 1;
                    metrics::record_rejected();
                    debug!(block = %id, "Block rejected");
                }
                Err(e) => {
                    warn!(block = %id, error = %e, "Block reject callback failed");
                    self.stats.failed_rejects += 1;
                    metrics::record_failed_reject();
                }
            }
        }
    }

    fn detach(&mut self, handle: Handle) -> Option<Node<B>> {
        let node = self.arena.remove(handle)?;
        if let Some(hs) = self.heights.get_mut(&node.height) {
            hs.retain(|h| *h != handle);
            if hs.is_empty() {
                self.heights.remove(&node.height);
            }
        }
        Some(node)
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    /// Whether the block was ever issued into consensus.
    pub fn issued(&self, block: &B) -> bool {
        block.status().decided() || self.arena.handle(&block.id()).is_some()
    }

    pub fn processing(&self, id: &BlockId) -> bool {
        self.processing.contains(id)
    }

    pub fn decided(&self, block: &B) -> bool {
        block.status().decided()
    }

    /// On the path from the preference to the anchor, or the anchor itself.
    pub fn is_preferred(&self, block: &B) -> bool {
        self.is_preferred_id(&block.id())
    }

    pub fn is_preferred_id(&self, id: &BlockId) -> bool {
        if *id == self.last_accepted {
            return true;
        }
        match self.arena.handle(&self.preference) {
            Some(start) if self.is_anchored(start) => self
                .arena
                .path(start)
                .any(|h| self.arena.get(h).is_some_and(|n| n.id == *id)),
            _ => false,
        }
    }

    pub fn preference(&self) -> BlockId {
        self.preference
    }

    pub fn finalized(&self) -> bool {
        self.finalized
    }

    pub fn num_processing(&self) -> usize {
        self.processing.len()
    }

    /// Tracked blocks including orphans.
    pub fn num_tracked(&self) -> usize {
        self.arena.len()
    }

    pub fn last_accepted(&self) -> BlockId {
        self.last_accepted
    }

    pub fn last_accepted_height(&self) -> u64 {
        self.last_accepted_height
    }

    pub fn last_accepted_time(&self) -> i64 {
        self.last_accepted_time
    }

    pub fn parameters(&self) -> &Parameters {
        &self.params
    }

    /// A tracked (undecided or orphaned) block.
    pub fn get(&self, id: &BlockId) -> Option<&B> {
        self.arena.by_id(id).map(|n| &n.block)
    }

    pub fn confidence(&self, id: &BlockId) -> Option<usize> {
        self.arena.by_id(id).map(|n| n.confidence)
    }

    pub fn health_check(&self) -> HealthReport {
        let processing = self.processing.len();
        HealthReport {
            processing,
            preference: self.preference,
            finalized: self.finalized,
            healthy: self.finalized || processing <= self.params.optimal_processing,
        }
    }

    pub fn stats(&self) -> ConsensusStats {
        self.stats
    }

    /// Blocks that left the store since the last call, in decision order.
    pub fn take_decided(&mut self) -> Vec<B> {
        std::mem::take(&mut self.decided)
    }

    /// Orphans evicted since the last call: stale after an accept, or
    /// failing the parent check on promotion.
    pub fn take_dropped_orphans(&mut self) -> Vec<BlockId> {
        std::mem::take(&mut self.dropped_orphans)
    }

    fn ensure_initialized(&self) -> ConsensusResult<()> {
        if self.initialized {
            Ok(())
        } else {
            Err(ConsensusError::NotInitialized)
        }
    }
}
