//! Execution records held by the Execution Store (spec §3, §4.5).

use std::collections::HashMap;

use conduit_core::{now_millis, EpochMillis, ExecutionId, NodeId, WorkflowId};
use conduit_telemetry::Span;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::status::{ExecutionStatus, NodeStatus};

/// Per-node execution detail, overwritten idempotently by later updates
/// for the same node (spec §4.5: "`updateNode` is idempotent").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeDetail {
    /// The node this detail describes.
    pub node_id: NodeId,
    /// Most recently recorded status.
    pub status: NodeStatus,
    /// When dispatch began.
    pub start_ms: EpochMillis,
    /// When dispatch ended, if it has.
    pub end_ms: Option<EpochMillis>,
    /// Input snapshot at dispatch time.
    pub input_snapshot: Value,
    /// Output snapshot, present once completed.
    pub output_snapshot: Option<Value>,
    /// Failure message, present iff `status == Failed`.
    pub error: Option<String>,
}

impl NodeDetail {
    /// Duration in milliseconds, or `None` while still running.
    #[must_use]
    pub fn duration_ms(&self) -> Option<i64> {
        self.end_ms.map(|end| end - self.start_ms)
    }
}

/// A single execution's full history (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRecord {
    /// Unique id of this execution.
    pub execution_id: ExecutionId,
    /// Workflow this execution is running.
    pub workflow_id: WorkflowId,
    /// Current status.
    pub status: ExecutionStatus,
    /// When the execution was created.
    pub start_ms: EpochMillis,
    /// When the execution reached a terminal status.
    pub end_ms: Option<EpochMillis>,
    /// Latest output recorded per node, keyed by node id.
    pub outputs: HashMap<NodeId, Value>,
    /// Latest detail recorded per node.
    pub nodes: HashMap<NodeId, NodeDetail>,
    /// Ordered traversal history — every node dispatched, in order.
    pub nodes_executed: Vec<NodeId>,
    /// Collected trace, if span collection was enabled for this run.
    pub spans: Vec<Span>,
    /// Failure message, present iff `status == Failed`.
    pub error: Option<String>,
}

impl ExecutionRecord {
    /// Start a new, empty record for an execution.
    #[must_use]
    pub fn new(execution_id: ExecutionId, workflow_id: WorkflowId) -> Self {
        Self {
            execution_id,
            workflow_id,
            status: ExecutionStatus::Pending,
            start_ms: now_millis(),
            end_ms: None,
            outputs: HashMap::new(),
            nodes: HashMap::new(),
            nodes_executed: Vec::new(),
            spans: Vec::new(),
            error: None,
        }
    }

    /// Record (or overwrite) a node's detail, appending to the traversal
    /// history only the first time this node is seen.
    pub fn update_node(&mut self, detail: NodeDetail) {
        if let Some(output) = &detail.output_snapshot {
            self.outputs.insert(detail.node_id, output.clone());
        }
        if !self.nodes.contains_key(&detail.node_id) {
            self.nodes_executed.push(detail.node_id);
        }
        self.nodes.insert(detail.node_id, detail);
    }

    /// Transition to a terminal status, stamping the end time.
    pub fn complete(&mut self, status: ExecutionStatus, error: Option<String>) {
        self.status = status;
        self.end_ms = Some(now_millis());
        self.error = error;
    }

    /// Whether this record has reached a terminal status.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}
