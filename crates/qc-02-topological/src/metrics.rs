//! # Consensus Metrics
//!
//! Prometheus metrics for the topological consensus store.
//!
//! ## Usage
//!
//! Enable with the `metrics` feature:
//! ```toml
//! qc-02-topological = { path = "...", features = ["metrics"] }
//! ```
//!
//! ## Metrics Exported
//!
//! - `consensus_processing` - Gauge of blocks awaiting a decision
//! - `consensus_accepted_total` - Counter of accepted blocks
//! - `consensus_rejected_total` - Counter of rejected blocks
//! - `consensus_failed_accept_total` - Counter of failed accept callbacks
//! - `consensus_failed_reject_total` - Counter of failed reject callbacks
//! - `consensus_polls_total` - Counter of recorded polls

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
use prometheus::{register_int_counter, register_int_gauge, IntCounter, IntGauge};

#[cfg(feature = "metrics")]
lazy_static! {
    pub static ref PROCESSING: IntGauge = register_int_gauge!(
        "consensus_processing",
        "Number of currently processing blocks"
    )
    .expect("Failed to create PROCESSING metric");

    pub static ref ACCEPTED: IntCounter = register_int_counter!(
        "consensus_accepted_total",
        "Number of accepted blocks"
    )
    .expect("Failed to create ACCEPTED metric");

    pub static ref REJECTED: IntCounter = register_int_counter!(
        "consensus_rejected_total",
        "Number of rejected blocks"
    )
    .expect("Failed to create REJECTED metric");

    pub static ref FAILED_ACCEPT: IntCounter = register_int_counter!(
        "consensus_failed_accept_total",
        "Number of blocks that failed to accept"
    )
    .expect("Failed to create FAILED_ACCEPT metric");

    pub static ref FAILED_REJECT: IntCounter = register_int_counter!(
        "consensus_failed_reject_total",
        "Number of blocks that failed to reject"
    )
    .expect("Failed to create FAILED_REJECT metric");

    pub static ref POLLS: IntCounter = register_int_counter!(
        "consensus_polls_total",
        "Number of polls recorded"
    )
    .expect("Failed to create POLLS metric");
}

// =============================================================================
// METRIC RECORDING FUNCTIONS
// =============================================================================

#[cfg(feature = "metrics")]
pub fn set_processing(count: usize) {
    PROCESSING.set(count as i64);
}

#[cfg(feature = "metrics")]
pub fn record_accepted() {
    ACCEPTED.inc();
}

#[cfg(feature = "metrics")]
pub fn record_rejected() {
    REJECTED.inc();
}

#[cfg(feature = "metrics")]
pub fn record_failed_accept() {
    FAILED_ACCEPT.inc();
}

#[cfg(feature = "metrics")]
pub fn record_failed_reject() {
    FAILED_REJECT.inc();
}

#[cfg(feature = "metrics")]
pub fn record_poll() {
    POLLS.inc();
}

// =============================================================================
// NO-OP IMPLEMENTATIONS (when metrics feature disabled)
// =============================================================================

#[cfg(not(feature = "metrics"))]
pub fn set_processing(_count: usize) {}

#[cfg(not(feature = "metrics"))]
pub fn record_accepted() {}

#[cfg(not(feature = "metrics"))]
pub fn record_rejected() {}

#[cfg(not(feature = "metrics"))]
pub fn record_failed_accept() {}

#[cfg(not(feature = "metrics"))]
pub fn record_failed_reject() {}

#[cfg(not(feature = "metrics"))]
pub fn record_poll() {}
