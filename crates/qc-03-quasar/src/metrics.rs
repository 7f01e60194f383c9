//! # Certifier Metrics
//!
//! Prometheus metrics for the Quasar certifier, behind the `metrics` feature.
//!
//! ## Metrics Exported
//!
//! - `quasar_shares_total` - Counter of accepted shares
//! - `quasar_certificates_total` - Counter of aggregated certificates
//! - `quasar_aggregation_failures_total` - Counter of failed aggregations
//! - `quasar_timeouts_total` - Counter of certificate wait timeouts
//! - `quasar_pool_size` - Gauge of precomputed items available

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
use prometheus::{register_int_counter, register_int_gauge, IntCounter, IntGauge};

#[cfg(feature = "metrics")]
lazy_static! {
    pub static ref SHARES: IntCounter = register_int_counter!(
        "quasar_shares_total",
        "Number of certificate shares accepted"
    )
    .expect("Failed to create SHARES metric");

    pub static ref CERTIFICATES: IntCounter = register_int_counter!(
        "quasar_certificates_total",
        "Number of certificates aggregated"
    )
    .expect("Failed to create CERTIFICATES metric");

    pub static ref AGGREGATION_FAILURES: IntCounter = register_int_counter!(
        "quasar_aggregation_failures_total",
        "Number of failed share aggregations"
    )
    .expect("Failed to create AGGREGATION_FAILURES metric");

    pub static ref TIMEOUTS: IntCounter = register_int_counter!(
        "quasar_timeouts_total",
        "Number of certificate waits that timed out"
    )
    .expect("Failed to create TIMEOUTS metric");

    pub static ref POOL_SIZE: IntGauge = register_int_gauge!(
        "quasar_pool_size",
        "Precomputed signing items available"
    )
    .expect("Failed to create POOL_SIZE metric");
}

// =============================================================================
// METRIC RECORDING FUNCTIONS
// =============================================================================

#[cfg(feature = "metrics")]
pub fn record_share() {
    SHARES.inc();
}

#[cfg(feature = "metrics")]
pub fn record_certificate() {
    CERTIFICATES.inc();
}

#[cfg(feature = "metrics")]
pub fn record_aggregation_failure() {
    AGGREGATION_FAILURES.inc();
}

#[cfg(feature = "metrics")]
pub fn record_timeout() {
    TIMEOUTS.inc();
}

#[cfg(feature = "metrics")]
pub fn set_pool_size(size: usize) {
    POOL_SIZE.set(size as i64);
}

// =============================================================================
// NO-OP IMPLEMENTATIONS (when metrics feature disabled)
// =============================================================================

#[cfg(not(feature = "metrics"))]
pub fn record_share() {}

#[cfg(not(feature = "metrics"))]
pub fn record_certificate() {}

#[cfg(not(feature = "metrics"))]
pub fn record_aggregation_failure() {}

#[cfg(not(feature = "metrics"))]
pub fn record_timeout() {}

#[cfg(not(feature = "metrics"))]
pub fn set_pool_size(_size: usize) {}
