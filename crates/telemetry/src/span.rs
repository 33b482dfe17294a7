//! Span data model (spec §4.7).

use conduit_core::{EpochMillis, SpanId, TraceId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A scalar attribute value — spans intentionally cannot carry structured
/// data, mirroring OpenTelemetry's attribute value restriction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    /// UTF-8 string.
    String(String),
    /// 64-bit signed integer.
    Int(i64),
    /// 64-bit float.
    Float(f64),
    /// Boolean flag.
    Bool(bool),
}

impl From<&str> for AttributeValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}
impl From<String> for AttributeValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}
impl From<i64> for AttributeValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}
impl From<f64> for AttributeValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}
impl From<bool> for AttributeValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}
impl From<usize> for AttributeValue {
    fn from(v: usize) -> Self {
        Self::Int(v as i64)
    }
}

/// An attribute map ordered by key, for deterministic snapshot export.
pub type Attributes = BTreeMap<String, AttributeValue>;

/// Final disposition of a span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpanStatusCode {
    /// Default — the span has not been explicitly marked OK or ERROR.
    Unset,
    /// The operation the span represents completed successfully.
    Ok,
    /// The operation failed.
    Error,
}

/// The status a span was ended with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpanStatus {
    /// OK / ERROR / UNSET.
    pub code: SpanStatusCode,
    /// Present when `code == Error`.
    pub message: Option<String>,
}

impl SpanStatus {
    /// A successful, message-less status.
    #[must_use]
    pub const fn ok() -> Self {
        Self {
            code: SpanStatusCode::Ok,
            message: None,
        }
    }

    /// An error status carrying a human-readable message.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            code: SpanStatusCode::Error,
            message: Some(message.into()),
        }
    }

    /// Still running / never explicitly closed with a disposition.
    #[must_use]
    pub const fn unset() -> Self {
        Self {
            code: SpanStatusCode::Unset,
            message: None,
        }
    }
}

/// A point-in-time event attached to a span (e.g. a recorded exception).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpanEvent {
    /// Event name, e.g. `"exception"`.
    pub name: String,
    /// Millisecond-epoch timestamp.
    pub timestamp: EpochMillis,
    /// Attributes describing the event.
    pub attributes: Attributes,
}

/// A single span in the execution's trace tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Span {
    /// Unique id of this span.
    pub span_id: SpanId,
    /// Id of the trace this span belongs to (shared with the whole tree).
    pub trace_id: TraceId,
    /// Parent span, if any — `None` only for the tree's root.
    pub parent_span_id: Option<SpanId>,
    /// Human-readable operation name, e.g. `"workflow.execute"`.
    pub name: String,
    /// Millisecond-epoch start time.
    pub start_ms: EpochMillis,
    /// Millisecond-epoch end time — `None` while the span is still open.
    pub end_ms: Option<EpochMillis>,
    /// Final disposition.
    pub status: SpanStatus,
    /// Scalar attributes attached at creation or during the span's life.
    pub attributes: Attributes,
    /// Timestamped events recorded during the span's life.
    pub events: Vec<SpanEvent>,
}

impl Span {
    /// Duration in milliseconds, or `None` while still open.
    #[must_use]
    pub fn duration_ms(&self) -> Option<i64> {
        self.end_ms.map(|end| end - self.start_ms)
    }

    /// Whether [`Span::end_ms`] has been set.
    #[must_use]
    pub fn is_ended(&self) -> bool {
        self.end_ms.is_some()
    }
}
