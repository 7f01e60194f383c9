//! # qc-02-topological
//!
//! Snowman-style metastable consensus over a tree of candidate blocks.
//!
//! ## Overview
//!
//! This subsystem provides:
//! - **Block tree**: undecided blocks rooted at the last accepted anchor
//! - **Vote bubbling**: a vote for a block counts for all its ancestors
//! - **Confidence**: consecutive polls a block stayed on the preferred path
//! - **Finality**: β consecutive polls accept a block and reject its
//!   same-height conflicts together with their descendants
//!
//! ## Architecture
//!
//! ```text
//! PollSet (1) ──votes──→ Topological (2) ──decided blocks──→ Beam (4)
//!                              │
//!                              └── preference ──→ VM
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use qc_02_topological::{Parameters, Topological};
//!
//! let mut store = Topological::<Block>::new();
//! store.initialize(Parameters::local(), genesis.id(), 0, genesis.timestamp())?;
//! store.add(child)?;
//! store.record_poll(&[child_id, child_id, child_id])?;
//! for decided in store.take_decided() {
//!     persist(decided);
//! }
//! ```

pub mod domain;
pub mod error;
pub mod metrics;
pub mod params;
pub mod store;

pub use domain::ConsensusBlock;
pub use error::{ConsensusError, ConsensusResult, ParamsError};
pub use params::{ParameterOverrides, Parameters};
pub use store::{ConsensusStats, HealthReport, Topological};
