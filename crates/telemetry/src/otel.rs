//! Optional dual-export to a real OpenTelemetry backend (spec §4.7).
//!
//! Conduit depends only on the lightweight `opentelemetry` crate for its
//! `Key`/`Value` vocabulary, not on an exporter or SDK — a host application
//! that wants spans shipped to Jaeger, Tempo, etc. implements this trait
//! itself against whichever exporter it already runs.

use opentelemetry::{Key, KeyValue, Value as OtelValue};

use crate::span::{AttributeValue, Span};

/// Receives finished spans for forwarding into an external tracing backend.
///
/// Calls happen synchronously from [`crate::SpanCollector::end_span`]-adjacent
/// code paths; implementations that need to do network I/O should queue and
/// hand off rather than block the caller.
pub trait OtelBridge: Send + Sync {
    /// Forward one completed span.
    fn export(&self, span: &Span);
}

/// An [`OtelBridge`] that does nothing — the default when no external
/// backend is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopBridge;

impl OtelBridge for NoopBridge {
    fn export(&self, _span: &Span) {}
}

/// Convert one of our scalar attributes into an `opentelemetry::KeyValue`.
#[must_use]
pub fn to_key_value(key: &str, value: &AttributeValue) -> KeyValue {
    let key = Key::new(key.to_string());
    let value = match value {
        AttributeValue::String(s) => OtelValue::String(s.clone().into()),
        AttributeValue::Int(i) => OtelValue::I64(*i),
        AttributeValue::Float(f) => OtelValue::F64(*f),
        AttributeValue::Bool(b) => OtelValue::Bool(*b),
    };
    KeyValue::new(key, value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_bridge_accepts_any_span_without_panicking() {
        let span = Span {
            span_id: conduit_core::SpanId::v4(),
            trace_id: conduit_core::TraceId::v4(),
            parent_span_id: None,
            name: "workflow.execute".into(),
            start_ms: 0,
            end_ms: Some(1),
            status: crate::span::SpanStatus::ok(),
            attributes: crate::span::Attributes::new(),
            events: Vec::new(),
        };
        NoopBridge.export(&span);
    }

    #[test]
    fn key_value_conversion_preserves_variant() {
        let kv = to_key_value("workflow.id", &AttributeValue::String("wf-1".into()));
        assert_eq!(kv.key.as_str(), "workflow.id");
    }
}
