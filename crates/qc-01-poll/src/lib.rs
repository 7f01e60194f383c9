//! # qc-01-poll
//!
//! Per-round vote collection for metastable consensus.
//!
//! ## Overview
//!
//! A poll is opened for every query round with the set of validators that
//! were sampled. Each validator answers once with a [`Vote`]; the poll is
//! finished when every expected voter has either voted or been dropped.
//! The [`PollResult`] carries the plurality winners, which the caller feeds
//! into the consensus store.
//!
//! ```text
//! Engine ──add(request_id, poll)──→ PollSet
//! Peers  ──vote(request_id, voter)─→ PollSet ──finished──→ result() ──→ record_poll
//! ```
//!
//! ## Concurrency
//!
//! The request-id map is read-mostly and sits behind an `RwLock`; each poll
//! has its own `Mutex`, so votes for different rounds never contend.
//!
//! ## Tie-break
//!
//! Equal counts resolve to the lowest block id.

pub mod domain;
pub mod error;
pub mod set;

pub use domain::{Poll, PollResult, SimplePoll, Vote};
pub use error::PollError;
pub use set::PollSet;
