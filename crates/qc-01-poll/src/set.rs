//! # Poll Set
//!
//! Open polls keyed by request id. Safe to share between the message loop
//! and any number of vote producers.

use crate::domain::{Poll, PollResult, Vote};
use crate::error::PollError;
use parking_lot::{Mutex, RwLock};
use shared_types::NodeId;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

type SharedPoll = Arc<Mutex<Box<dyn Poll>>>;

/// Concurrent map of open polls.
#[derive(Default)]
pub struct PollSet {
    polls: RwLock<HashMap<u32, SharedPoll>>,
}

impl PollSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a poll under `request_id`.
    pub fn add(&self, request_id: u32, poll: Box<dyn Poll>) -> Result<(), PollError> {
        let mut polls = self.polls.write();
        if polls.contains_key(&request_id) {
            return Err(PollError::AlreadyExists { request_id });
        }
        debug!(request_id, poll = %poll, "Poll opened");
        polls.insert(request_id, Arc::new(Mutex::new(poll)));
        Ok(())
    }

    /// Record a vote. Returns whether the poll is now finished.
    pub fn vote(&self, request_id: u32, voter: NodeId, vote: Vote) -> Result<bool, PollError> {
        let poll = self.lookup(request_id)?;
        let mut poll = poll.lock();
        poll.vote(voter, vote)?;
        Ok(poll.finished())
    }

    /// Stop waiting for `voter`. Returns whether the poll is now finished.
    pub fn drop_voter(&self, request_id: u32, voter: &NodeId) -> Result<bool, PollError> {
        let poll = self.lookup(request_id)?;
        let mut poll = poll.lock();
        poll.drop_voter(voter);
        Ok(poll.finished())
    }

    /// Result of a finished poll, leaving it in the set.
    pub fn result(&self, request_id: u32) -> Result<PollResult, PollError> {
        self.lookup(request_id)?.lock().result()
    }

    pub fn finished(&self, request_id: u32) -> Option<bool> {
        self.polls
            .read()
            .get(&request_id)
            .map(|poll| poll.lock().finished())
    }

    /// Human-readable summary of an open poll.
    pub fn describe(&self, request_id: u32) -> Option<String> {
        self.polls
            .read()
            .get(&request_id)
            .map(|poll| poll.lock().to_string())
    }

    /// Remove a poll, returning its result if it had finished.
    pub fn remove(&self, request_id: u32) -> Result<Option<PollResult>, PollError> {
        let poll = self
            .polls
            .write()
            .remove(&request_id)
            .ok_or(PollError::NotFound { request_id })?;
        let poll = poll.lock();
        debug!(request_id, poll = %*poll, "Poll removed");
        Ok(poll.result().ok())
    }

    pub fn contains(&self, request_id: u32) -> bool {
        self.polls.read().contains_key(&request_id)
    }

    pub fn len(&self) -> usize {
        self.polls.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.polls.read().is_empty()
    }

    fn lookup(&self, request_id: u32) -> Result<SharedPoll, PollError> {
        self.polls
            .read()
            .get(&request_id)
            .cloned()
            .ok_or(PollError::NotFound { request_id })
    }
}
