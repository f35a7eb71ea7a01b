//! Binas Testing Infrastructure
//!
//! Shared fixtures for the quorum and rental test suites: an in-memory
//! station network with per-station fault injection and a cluster factory.
//!
//! Add this to your crate's `Cargo.toml` dev-dependencies:
//! ```toml
//! [dev-dependencies]
//! binas-testkit = { path = "../binas-testkit" }
//! ```

#![forbid(unsafe_code)]

pub mod cluster;
pub mod network;

pub use cluster::{TestCluster, TEST_PREFIX, TEST_QUORUM_TIMEOUT_MS};
pub use network::{Fault, FaultyStationClient, MemoryNetwork};

use once_cell::sync::OnceCell;
use tracing_subscriber::EnvFilter;

static TRACING: OnceCell<()> = OnceCell::new();

/// Install a test-friendly tracing subscriber once per process.
///
/// Honors `RUST_LOG`; silent by default.
pub fn init_test_tracing() {
    TRACING.get_or_init(|| {
        let installed = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
        // A subscriber installed by the test harness itself is kept.
        if let Err(error) = installed {
            tracing::debug!(error = %error, "Keeping existing tracing subscriber");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracing_can_be_initialized_repeatedly() {
        init_test_tracing();
        init_test_tracing();
        tracing::info!("still logging");
        assert!(TRACING.get().is_some());
    }
}
