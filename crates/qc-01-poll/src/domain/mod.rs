//! Poll domain: votes, results and the simple poll.

mod poll;
mod vote;

pub use poll::{Poll, SimplePoll};
pub use vote::{PollResult, Vote};
