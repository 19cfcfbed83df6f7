//! Tracing setup for tests.

use std::sync::Once;

/// Initializes a test-writer tracing subscriber once per process, filtered
/// by `RUST_LOG`. Safe to call from every test.
pub fn init_test_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}
