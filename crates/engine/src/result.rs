//! The execution result shape handed back from `execute`/`resume` (spec §6.7).

use std::collections::HashMap;

use conduit_core::{ExecutionId, NodeId};
use conduit_execution::ResumeState;
use conduit_telemetry::Span;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::EngineError;

/// `error: {message, name, stack?}` from spec §6.7 — present iff
/// `status == "failed"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionFailure {
    /// Human-readable failure message.
    pub message: String,
    /// Stable error-kind name (spec §7's taxonomy names, not Display text).
    pub name: String,
}

impl ExecutionFailure {
    /// Build a failure record from an [`EngineError`].
    #[must_use]
    pub fn from_error(error: &EngineError) -> Self {
        Self { message: error.to_string(), name: error.kind_name().to_string() }
    }
}

/// The terminal or paused outcome of `execute`/`resume` (spec §6.7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// The execution this result describes.
    pub execution_id: ExecutionId,
    /// Final status: `completed`, `failed`, `paused`, or `cancelled`.
    pub status: conduit_execution::ExecutionStatus,
    /// Latest output per node, keyed by the node's string id — except for
    /// parallel-branch outputs, which are merged in under the synthetic
    /// `"<parallelNodeId>.<branchNodeId>"` key (spec §4.3).
    pub outputs: HashMap<String, Value>,
    /// Wall-clock duration of the run in milliseconds.
    pub execution_time_ms: i64,
    /// Every node dispatched, in traversal order.
    pub nodes_executed: Vec<NodeId>,
    /// Collected span tree, present iff [`crate::ExecutionOptions::collect_spans`]
    /// was set.
    pub spans: Option<Vec<Span>>,
    /// Present iff `status == "failed"`.
    pub error: Option<ExecutionFailure>,
    /// Present iff `status == "paused"`.
    pub resume_state: Option<ResumeState>,
}

impl ExecutionResult {
    /// Whether this run finished successfully.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == conduit_execution::ExecutionStatus::Completed
    }

    /// Whether this run ended in failure.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        self.status == conduit_execution::ExecutionStatus::Failed
    }

    /// Whether this run paused awaiting an external event.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.status == conduit_execution::ExecutionStatus::Paused
    }
}
