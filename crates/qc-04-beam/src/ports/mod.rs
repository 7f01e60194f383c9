//! Ports for the Beam engine.

pub mod outbound;

pub use outbound::{BlsSigner, Sender, Vm};
