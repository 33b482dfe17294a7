//! Event kinds published on the bus (spec §4.6).

use conduit_core::{ExecutionId, NodeId, WorkflowId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single lifecycle event. Every variant that is scoped to one execution
/// carries its `execution_id` so a per-execution subscriber can be
/// implemented purely as a bus-side filter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// `workflow.started`
    WorkflowStarted {
        execution_id: ExecutionId,
        workflow_id: WorkflowId,
    },
    /// `workflow.resumed`
    WorkflowResumed {
        execution_id: ExecutionId,
        node_id: NodeId,
    },
    /// `workflow.completed`
    WorkflowCompleted {
        execution_id: ExecutionId,
        duration_ms: i64,
    },
    /// `workflow.failed`
    WorkflowFailed {
        execution_id: ExecutionId,
        error: String,
    },
    /// `workflow.paused`
    WorkflowPaused {
        execution_id: ExecutionId,
        node_id: NodeId,
        waiting_for: Vec<String>,
    },
    /// `node.started`
    NodeStarted {
        execution_id: ExecutionId,
        node_id: NodeId,
    },
    /// `node.completed`
    NodeCompleted {
        execution_id: ExecutionId,
        node_id: NodeId,
        output: Value,
    },
    /// `workflow.result` — the final serialized result (spec §6.7), always
    /// emitted exactly once per execution when it reaches a terminal state.
    WorkflowResult {
        execution_id: ExecutionId,
        result: Value,
    },
    /// `procedure.started`
    ProcedureStarted {
        request_id: String,
        procedure: String,
    },
    /// `procedure.completed`
    ProcedureCompleted {
        request_id: String,
        procedure: String,
        output: Value,
    },
    /// `procedure.failed`
    ProcedureFailed {
        request_id: String,
        procedure: String,
        error: String,
    },
}

impl Event {
    /// The execution this event is scoped to, if any. Procedure events
    /// raised outside a workflow context (a one-shot RPC call) have none.
    #[must_use]
    pub fn execution_id(&self) -> Option<ExecutionId> {
        match self {
            Self::WorkflowStarted { execution_id, .. }
            | Self::WorkflowResumed { execution_id, .. }
            | Self::WorkflowCompleted { execution_id, .. }
            | Self::WorkflowFailed { execution_id, .. }
            | Self::WorkflowPaused { execution_id, .. }
            | Self::NodeStarted { execution_id, .. }
            | Self::NodeCompleted { execution_id, .. }
            | Self::WorkflowResult { execution_id, .. } => Some(*execution_id),
            Self::ProcedureStarted { .. }
            | Self::ProcedureCompleted { .. }
            | Self::ProcedureFailed { .. } => None,
        }
    }

    /// Whether this event marks the end of an execution's observable
    /// lifetime — the per-execution topic closes right after it.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::WorkflowResult { .. })
    }

    /// The dotted event-kind name, matching the naming spec §4.6 uses.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::WorkflowStarted { .. } => "workflow.started",
            Self::WorkflowResumed { .. } => "workflow.resumed",
            Self::WorkflowCompleted { .. } => "workflow.completed",
            Self::WorkflowFailed { .. } => "workflow.failed",
            Self::WorkflowPaused { .. } => "workflow.paused",
            Self::NodeStarted { .. } => "node.started",
            Self::NodeCompleted { .. } => "node.completed",
            Self::WorkflowResult { .. } => "workflow.result",
            Self::ProcedureStarted { .. } => "procedure.started",
            Self::ProcedureCompleted { .. } => "procedure.completed",
            Self::ProcedureFailed { .. } => "procedure.failed",
        }
    }
}
