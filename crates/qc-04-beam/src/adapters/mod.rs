//! Reference adapters for the Beam ports.
//!
//! In-process implementations used by tests and single-node setups.

pub mod bls;
pub mod sender;
pub mod vm;

pub use bls::MockBlsSigner;
pub use sender::RecordingSender;
pub use vm::InMemoryVm;
