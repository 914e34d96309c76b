//! Telemetry helpers for structured logging and tracing.
//!
//! The gatekeeper emits `debug` and `trace` events under the
//! `prometheus_gatekeeper` target; enable them with
//! `RUST_LOG=prometheus_gatekeeper=trace`.

/// Initialize tracing/telemetry. Users can install their own subscriber; this
/// helper installs a default env-based subscriber if none is set.
pub fn init_tracing() {
    if tracing::dispatcher::has_been_set() {
        return;
    }
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}
