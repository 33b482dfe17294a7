//! Per-execution span tree collector (spec §4.7).

use std::collections::HashMap;

use conduit_core::{now_millis, SpanId, TraceId};
use parking_lot::RwLock;

use crate::span::{AttributeValue, Attributes, Span, SpanEvent, SpanStatus};

/// Builds and owns the span tree for a single execution.
///
/// Writes are confined to the owning execution (spec §5's shared-resource
/// policy); concurrent reads via [`SpanCollector::snapshot`] are safe at any
/// time because the internal map is lock-guarded, not because concurrent
/// writers are expected.
pub struct SpanCollector {
    trace_id: TraceId,
    spans: RwLock<HashMap<SpanId, Span>>,
}

impl SpanCollector {
    /// Start a new collector for a fresh trace.
    #[must_use]
    pub fn new() -> Self {
        Self {
            trace_id: TraceId::v4(),
            spans: RwLock::new(HashMap::new()),
        }
    }

    /// The trace every span in this collector belongs to.
    #[must_use]
    pub const fn trace_id(&self) -> TraceId {
        self.trace_id
    }

    /// Start a span, returning its id. `parent` must reference a span
    /// already started in this collector, or be `None` for the root.
    pub fn start_span(
        &self,
        name: impl Into<String>,
        attributes: Attributes,
        parent: Option<SpanId>,
    ) -> SpanId {
        let span_id = SpanId::v4();
        let span = Span {
            span_id,
            trace_id: self.trace_id,
            parent_span_id: parent,
            name: name.into(),
            start_ms: now_millis(),
            end_ms: None,
            status: SpanStatus::unset(),
            attributes,
            events: Vec::new(),
        };
        self.spans.write().insert(span_id, span);
        span_id
    }

    /// Close a span with a final status.
    pub fn end_span(&self, span_id: SpanId, status: SpanStatus) {
        let mut spans = self.spans.write();
        if let Some(span) = spans.get_mut(&span_id) {
            span.end_ms = Some(now_millis());
            span.status = status;
        } else {
            tracing::warn!(?span_id, "end_span called for unknown span");
        }
    }

    /// Attach or overwrite an attribute on an already-started span — used
    /// for attributes only known once the operation finishes, like the
    /// root span's `workflow.nodes_executed_total`.
    pub fn set_attribute(&self, span_id: SpanId, key: impl Into<String>, value: AttributeValue) {
        if let Some(span) = self.spans.write().get_mut(&span_id) {
            span.attributes.insert(key.into(), value);
        }
    }

    /// Record a timestamped event on a span, e.g. a caught exception.
    pub fn add_event(&self, span_id: SpanId, name: impl Into<String>, attributes: Attributes) {
        if let Some(span) = self.spans.write().get_mut(&span_id) {
            span.events.push(SpanEvent {
                name: name.into(),
                timestamp: now_millis(),
                attributes,
            });
        }
    }

    /// Record an exception on a span and mark it as errored in one call —
    /// the common failure path described in spec §4.7.
    pub fn record_exception(&self, span_id: SpanId, message: impl Into<String>) {
        let message = message.into();
        let mut attrs = Attributes::new();
        attrs.insert("exception.message".into(), AttributeValue::String(message.clone()));
        self.add_event(span_id, "exception", attrs);
        self.end_span(span_id, SpanStatus::error(message));
    }

    /// A consistent, cloned snapshot of every span collected so far.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Span> {
        self.spans.read().values().cloned().collect()
    }

    /// Look up one span by id.
    #[must_use]
    pub fn get(&self, span_id: SpanId) -> Option<Span> {
        self.spans.read().get(&span_id).cloned()
    }
}

impl Default for SpanCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_span_has_no_parent_and_children_reference_it() {
        let collector = SpanCollector::new();
        let root = collector.start_span("workflow.execute", Attributes::new(), None);
        let child = collector.start_span("workflow.node.procedure", Attributes::new(), Some(root));

        let root_span = collector.get(root).unwrap();
        let child_span = collector.get(child).unwrap();
        assert!(root_span.parent_span_id.is_none());
        assert_eq!(child_span.parent_span_id, Some(root));
        assert_eq!(child_span.trace_id, root_span.trace_id);
    }

    #[test]
    fn end_span_sets_duration_and_status() {
        let collector = SpanCollector::new();
        let span_id = collector.start_span("op", Attributes::new(), None);
        collector.end_span(span_id, SpanStatus::ok());
        let span = collector.get(span_id).unwrap();
        assert!(span.is_ended());
        assert!(span.duration_ms().unwrap() >= 0);
        assert_eq!(span.status, SpanStatus::ok());
    }

    #[test]
    fn record_exception_marks_error_and_appends_event() {
        let collector = SpanCollector::new();
        let span_id = collector.start_span("op", Attributes::new(), None);
        collector.record_exception(span_id, "divide by zero");
        let span = collector.get(span_id).unwrap();
        assert_eq!(span.status.code, crate::span::SpanStatusCode::Error);
        assert_eq!(span.events.len(), 1);
        assert_eq!(span.events[0].name, "exception");
    }

    #[test]
    fn root_duration_covers_children() {
        let collector = SpanCollector::new();
        let root = collector.start_span("workflow.execute", Attributes::new(), None);
        let child = collector.start_span("workflow.node.procedure", Attributes::new(), Some(root));
        collector.end_span(child, SpanStatus::ok());
        collector.end_span(root, SpanStatus::ok());

        let root_span = collector.get(root).unwrap();
        let child_span = collector.get(child).unwrap();
        assert!(root_span.duration_ms().unwrap() >= child_span.duration_ms().unwrap());
    }
}
