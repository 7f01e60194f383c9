//! # Quasar Consensus Test Suite
//!
//! Cross-crate flows driven through real engines.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── harness.rs        # In-process network of Beam engines
//! └── integration/      # Multi-node flows
//!     ├── flows.rs      # Polling, acceptance, ancestor sync
//!     └── quantum.rs    # Certification, quantum finality, slashing
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p qc-tests
//! RUST_LOG=debug cargo test -p qc-tests integration::quantum
//! cargo bench -p qc-tests
//! ```

pub mod harness;
pub mod integration;

use std::sync::Once;
use tracing_subscriber::EnvFilter;

static TRACING: Once = Once::new();

/// Install a test-friendly subscriber once per process, filtered by `RUST_LOG`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}
