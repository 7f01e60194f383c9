use shared_types::BlockId;
use std::collections::BTreeMap;

/// A single validator's answer to a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Vote {
    /// Tip the voter currently prefers.
    pub preferred_id: BlockId,
    /// Last block the voter accepted.
    pub accepted_id: BlockId,
}

impl Vote {
    pub fn new(preferred_id: BlockId, accepted_id: BlockId) -> Self {
        Self {
            preferred_id,
            accepted_id,
        }
    }
}

/// Plurality winners of a finished poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PollResult {
    pub preferred_id: BlockId,
    pub accepted_id: BlockId,
    pub preference_count: usize,
    pub acceptance_count: usize,
}

impl PollResult {
    /// Tally votes. Ties go to the lowest id.
    pub fn tally<'a>(votes: impl IntoIterator<Item = &'a Vote>) -> Self {
        let mut preferred: BTreeMap<BlockId, usize> = BTreeMap::new();
        let mut accepted: BTreeMap<BlockId, usize> = BTreeMap::new();
        for vote in votes {
            *preferred.entry(vote.preferred_id).or_default() += 1;
            *accepted.entry(vote.accepted_id).or_default() += 1;
        }

        let (preferred_id, preference_count) = plurality(&preferred);
        let (accepted_id, acceptance_count) = plurality(&accepted);
        Self {
            preferred_id,
            accepted_id,
            preference_count,
            acceptance_count,
        }
    }
}

/// Highest count; ascending iteration plus strict `>` keeps the lowest id.
fn plurality(counts: &BTreeMap<BlockId, usize>) -> (BlockId, usize) {
    let mut best = (BlockId::EMPTY, 0);
    for (id, count) in counts {
        if *count > best.1 {
            best = (*id, *count);
        }
    }
    best
}
