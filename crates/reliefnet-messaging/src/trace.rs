//! W3C trace-context propagation over message headers.
//!
//! The bus injects the current span's context into envelope headers on the
//! produce path and extracts it on the consume path, so one trace follows a
//! disaster across all three services. [`crate::envelope::Headers`]
//! implements the carrier traits; this module wires them to the global
//! text-map propagator.

use opentelemetry::Context;
use opentelemetry::global;
use opentelemetry_sdk::propagation::TraceContextPropagator;
use tracing_opentelemetry::OpenTelemetrySpanExt;

use crate::envelope::Headers;

/// Installs the W3C `traceparent`/`tracestate` propagator globally.
///
/// Call once at startup, before the first publish or consume. Exporter
/// wiring (OTLP endpoints etc.) is the binary's concern, not this crate's.
pub fn init_propagation() {
    global::set_text_map_propagator(TraceContextPropagator::new());
}

/// Writes the current span's trace context into `headers`.
pub fn inject(headers: &mut Headers) {
    let context = tracing::Span::current().context();
    global::get_text_map_propagator(|propagator| propagator.inject_context(&context, headers));
}

/// Reads a trace context out of `headers`; empty headers yield the root
/// context.
#[must_use]
pub fn extract(headers: &Headers) -> Context {
    global::get_text_map_propagator(|propagator| propagator.extract(headers))
}

/// Makes `span` a child of the remote context carried in `headers`. A span
/// that cannot take a parent (closed, or no otel layer installed) breaks
/// trace continuity but nothing else; the failure is logged, not raised.
pub fn link_parent(span: &tracing::Span, headers: &Headers) {
    if let Err(err) = span.set_parent(extract(headers)) {
        tracing::debug!(error = ?err, "failed to link parent trace context");
    }
}
