//! Domain layer for topological consensus.

pub mod arena;
pub mod block;

pub use arena::{Arena, Handle, Node, Parent};
pub use block::ConsensusBlock;
