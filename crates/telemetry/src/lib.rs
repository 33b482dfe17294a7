//! # Conduit Telemetry
//!
//! Span-tree collection for workflow executions (spec §4.7). Every
//! execution gets its own [`SpanCollector`] rooted at a `workflow.execute`
//! span; node dispatch and procedure invocation open child spans under it.
//! Attributes are scalar-only, matching OpenTelemetry's own restriction, so
//! a collected tree can be forwarded to a real backend via [`OtelBridge`]
//! without lossy conversion.

mod collector;
mod otel;
mod span;

pub use collector::SpanCollector;
pub use otel::{to_key_value, NoopBridge, OtelBridge};
pub use span::{AttributeValue, Attributes, Span, SpanEvent, SpanStatus, SpanStatusCode};
