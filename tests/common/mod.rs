//! Shared test setup. Not a test binary itself (`tests/common/mod.rs`
//! is the standard way to exclude a helper module from being collected
//! as its own integration-test crate).

use std::sync::Once;

static INIT: Once = Once::new();

/// Initializes a `tracing` subscriber once per test binary, so
/// `--nocapture` runs show protocol-level spans. Mirrors the teacher's
/// `main.rs` subscriber setup; safe to call from every test since `Once`
/// makes repeat calls a no-op.
pub fn init_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).try_init();
    });
}
