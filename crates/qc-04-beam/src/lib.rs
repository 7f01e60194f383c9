//! # qc-04-beam
//!
//! Beam consensus engine: turns network messages into topological consensus
//! decisions and, in quantum mode, certifies every block it builds with a
//! BLS aggregate and a Ringtail threshold certificate.
//!
//! ## Overview
//!
//! This subsystem provides:
//! - **Message loop**: bounded inbound queue drained by one task
//! - **Sender task**: bounded outbound queue delivered through the `Sender`
//!   port; a full queue drops and counts
//! - **Polling**: K-sample polls via `PollSet`, results fed into `Topological`
//! - **Block production**: one build at a time, certified through Quasar
//! - **Slashing**: a missing Ringtail certificate reports the proposer on a
//!   bounded slash channel
//!
//! ## Architecture
//!
//! ```text
//!              ┌──────────────── BeamEngine ────────────────┐
//!  Message ──→ │ inbound ─→ handlers ─→ Topological (2)     │
//!              │               │     └─→ PollSet (1)        │
//!              │               └───────→ Quasar (3)         │
//!              │ outbound ─→ Sender port                    │
//!              │ slash ────→ SlashEvent receiver            │
//!              └────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! let engine = BeamEngine::new(EngineConfig::default(), deps)?;
//! engine.start().await?;
//! let block = engine.build_block(&cancel).await?;
//! engine.push_poll(&block)?;
//! ```

pub mod adapters;
pub mod config;
pub mod domain;
pub mod error;
pub mod events;
pub mod ports;
pub mod service;

pub use config::EngineConfig;
pub use domain::{Message, NodeIdentity, OutboundMessage, ShareGossip};
pub use error::{EngineError, EngineResult};
pub use events::{SlashEvent, SlashReason};
pub use ports::{BlsSigner, Sender, Vm};
pub use service::{BeamDependencies, BeamEngine, EngineStats, ThresholdCrypto};
