//! Process-wide tracing/logging setup for applications embedding the fiscal
//! core. The domain crates only emit `tracing` events; wiring a subscriber
//! is the host's job, and this is the default wiring.

pub mod tracing;

/// Initialize observability (tracing/logging).
///
/// Safe to call multiple times; subsequent calls are no-ops.
pub fn init() {
    tracing::init();
}
