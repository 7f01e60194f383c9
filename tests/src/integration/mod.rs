//! Multi-node integration flows.

pub mod flows;
pub mod quantum;
