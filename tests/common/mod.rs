//! Shared helpers for integration tests

#![allow(dead_code)]

use consent_scopes::{ConsentForest, ConsentRecord};
use tracing_subscriber::EnvFilter;

/// Install a test subscriber honouring `RUST_LOG`
///
/// Safe to call from every test; only the first call installs.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Consent record with `id` as the last entry of `path`
pub fn consent(client: &str, scope: &str, path: &[u64]) -> ConsentRecord {
    let id = path.last().copied().unwrap_or_default();
    ConsentRecord::new(id, client, scope, path.iter().copied())
}

/// `A(client0) -> B(client1) -> C(client2)`
pub fn chain_forest() -> ConsentForest {
    init_tracing();
    ConsentForest::build(vec![
        consent("client0", "A", &[1]),
        consent("client1", "B", &[1, 2]),
        consent("client2", "C", &[1, 2, 3]),
    ])
    .unwrap()
}
