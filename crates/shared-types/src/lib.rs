//! # Shared Types Crate
//!
//! Block model, identifiers and capability traits shared by every consensus
//! crate in the workspace.
//!
//! ## Contents
//!
//! - **Entities**: `BlockId`, `NodeId`, `Status`, `CertBundle`
//! - **Block**: the unit of consensus, its wire codec and status machine
//! - **Errors**: `BlockError`, `CodecError` and the `ErrorCategory` taxonomy
//! - **Capabilities**: `TimeSource`, `Validators` with reference adapters
//!
//! ## Block Lifecycle
//!
//! ```text
//! [PROCESSING] ──accept──→ [ACCEPTED] ──set_quantum (dual cert)──→ [QUANTUM]
//!      │
//!      └──────reject──────→ [REJECTED]
//! ```

pub mod block;
pub mod entities;
pub mod errors;
pub mod time;
pub mod validators;

pub use block::Block;
pub use entities::*;
pub use errors::*;
pub use time::{FixedTimeSource, SystemTimeSource, TimeSource};
pub use validators::{StaticValidatorSet, Validators};
