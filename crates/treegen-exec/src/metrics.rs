//! Metrics hooks.
//!
//! Key/value pairs go out as `tracing` events at TRACE level under a
//! `treegen` span; wire a subscriber in the binary layer to collect them.

pub fn emit_span(event: &str, key_values: &[(&str, String)]) {
    let span = tracing::trace_span!("treegen", event);
    let _entered = span.enter();
    for (k, v) in key_values {
        tracing::trace!(%event, %k, %v, "metric");
    }
}
