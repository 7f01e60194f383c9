use super::vote::{PollResult, Vote};
use crate::error::PollError;
use shared_types::NodeId;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::time::{Duration, Instant};

/// One query round.
pub trait Poll: fmt::Display + Send {
    fn id(&self) -> u32;

    /// Record `voter`'s answer. A repeat vote overwrites the earlier one.
    fn vote(&mut self, voter: NodeId, vote: Vote) -> Result<(), PollError>;

    /// Stop waiting for `voter`, discarding any vote it cast.
    fn drop_voter(&mut self, voter: &NodeId);

    fn finished(&self) -> bool;

    fn result(&self) -> Result<PollResult, PollError>;
}

/// Poll that finishes once every expected voter answered or was dropped.
#[derive(Debug)]
pub struct SimplePoll {
    id: u32,
    voters: HashSet<NodeId>,
    votes: HashMap<NodeId, Vote>,
    finished: bool,
    started_at: Instant,
}

impl SimplePoll {
    pub fn new(id: u32, voters: impl IntoIterator<Item = NodeId>) -> Self {
        let voters: HashSet<NodeId> = voters.into_iter().collect();
        Self {
            id,
            finished: voters.is_empty(),
            voters,
            votes: HashMap::new(),
            started_at: Instant::now(),
        }
    }

    /// Time since the poll was opened.
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    pub fn expected(&self) -> usize {
        self.voters.len()
    }

    pub fn received(&self) -> usize {
        self.votes.len()
    }

    fn refresh(&mut self) {
        if self.votes.len() >= self.voters.len() {
            self.finished = true;
        }
    }
}

impl Poll for SimplePoll {
    fn id(&self) -> u32 {
        self.id
    }

    fn vote(&mut self, voter: NodeId, vote: Vote) -> Result<(), PollError> {
        if self.finished {
            return Err(PollError::AlreadyFinished {
                request_id: self.id,
            });
        }
        if !self.voters.contains(&voter) {
            return Err(PollError::UnexpectedVoter {
                request_id: self.id,
                voter,
            });
        }
        self.votes.insert(voter, vote);
        self.refresh();
        Ok(())
    }

    fn drop_voter(&mut self, voter: &NodeId) {
        self.voters.remove(voter);
        self.votes.remove(voter);
        self.refresh();
    }

    fn finished(&self) -> bool {
        self.finished
    }

    fn result(&self) -> Result<PollResult, PollError> {
        if !self.finished {
            return Err(PollError::NotFinished {
                request_id: self.id,
            });
        }
        Ok(PollResult::tally(self.votes.values()))
    }
}

impl fmt::Display for SimplePoll {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Poll{{id={}, votes={}/{}, finished={}}}",
            self.id,
            self.votes.len(),
            self.voters.len(),
            self.finished
        )
    }
}
