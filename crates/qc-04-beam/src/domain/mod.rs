//! Domain layer for the Beam engine.

pub mod identity;
pub mod message;

pub use identity::NodeIdentity;
pub use message::{Message, OutboundMessage, ShareGossip};
