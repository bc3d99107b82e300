//! Tracing subscriber initialization.

use tracing_subscriber::EnvFilter;

/// Install the default subscriber: JSON lines, `RUST_LOG`-configurable
/// filtering, `info` if unset.
///
/// Allocation warnings (sequence exhaustion, approaching expiration) are the
/// events worth alerting on; they are emitted at `warn`.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false)
        .try_init();
}
