//! Per-invocation context descriptor (spec §4.2).

use std::collections::HashMap;

use conduit_core::SpanId;
use serde_json::Value;

/// Everything the Executor knows about the caller of a single invocation,
/// independent of whether that caller is an external transport or a
/// `procedure` workflow node.
#[derive(Debug, Clone)]
pub struct InvocationContext {
    /// Correlates this invocation's events and logs end to end.
    pub request_id: String,
    /// Where the call came from, e.g. `"http"`, `"workflow"`, `"sdk"`.
    pub transport: String,
    /// Arbitrary caller-supplied metadata (headers, tenant id, etc.).
    pub metadata: HashMap<String, Value>,
    /// Span to parent the procedure's span under, if the caller already
    /// has a trace in progress (e.g. a workflow engine execution).
    pub parent_span_id: Option<SpanId>,
}

impl InvocationContext {
    /// A context for a one-shot call with no parent trace.
    #[must_use]
    pub fn new(request_id: impl Into<String>, transport: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            transport: transport.into(),
            metadata: HashMap::new(),
            parent_span_id: None,
        }
    }

    /// Attach a parent span, e.g. when invoked from within a workflow.
    #[must_use]
    pub fn with_parent_span(mut self, span_id: SpanId) -> Self {
        self.parent_span_id = Some(span_id);
        self
    }

    /// Attach a metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}
