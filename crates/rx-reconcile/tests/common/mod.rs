//! Common test utilities for reconciliation
//!
//! Mock hosts with injectable failures, feature fixtures and a tracing
//! helper.

#![allow(dead_code)]

mod fixtures;
mod mock_devices;
mod mock_oracle;

pub use fixtures::*;
pub use mock_devices::*;
pub use mock_oracle::*;

/// Install a test subscriber honoring `RUST_LOG`
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
