//! # qc-03-quasar
//!
//! Post-quantum certificate layer: collects Ringtail threshold shares per
//! block height and aggregates them into a certificate.
//!
//! ## Overview
//!
//! This subsystem provides:
//! - **Share collection**: one share per validator per height, last write wins
//! - **Aggregation**: exactly one aggregation per height once the threshold
//!   is reached, delivered to every registered waiter
//! - **Bounded waits**: timeouts and cancellation remove the waiter
//! - **Precomputation**: a bounded pool of signing material refilled in the
//!   background, consumed by `quick_sign`
//! - **Dual verification**: BLS aggregate plus Ringtail certificate
//!
//! ## Architecture
//!
//! ```text
//!  Beam (4) ──quick_sign / on_share──→ Quasar ──aggregate──→ ThresholdSigner
//!     ↑                                  │
//!     └────────── certificate ───────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! let quasar = Quasar::new(node_id, secret, QuasarConfig::default(), deps)?;
//! let waiter = quasar.subscribe(height);
//! quasar.on_share(height, node_id, quasar.quick_sign(&digest)?)?;
//! let cert = quasar.wait(waiter, config.timeout, &cancel).await?;
//! ```

pub mod adapters;
pub mod config;
pub mod domain;
pub mod error;
pub mod metrics;
pub mod ports;
pub mod service;

pub use config::QuasarConfig;
pub use domain::{
    share_digest, Certificate, Precomputed, Share, WaiterId, CERTIFICATE_SIZE, SHARE_SIZE,
};
pub use error::{QuasarError, QuasarResult};
pub use ports::{CertificateVerifier, ThresholdSigner};
pub use service::{CertificateWaiter, Quasar, QuasarDependencies, QuasarStats};
