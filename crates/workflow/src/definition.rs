//! Workflow definition (spec §3, §6.4).

use std::collections::HashMap;

use conduit_core::{NodeId, WorkflowId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::node::WorkflowNode;

/// Binds a workflow to an inbound event source (spec §3, §4.4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerBinding {
    /// Event provider/source name, e.g. `"drive"`.
    pub provider: String,
    /// Name of the trigger procedure invoked on `deploy`.
    pub trigger_procedure_name: String,
    /// Event type this binding starts fresh executions for.
    pub event_type: String,
}

/// A persisted workflow graph (spec §3, §6.4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    /// Stable identity, paired with `version` for optimistic updates.
    pub id: WorkflowId,
    /// Monotonically increasing revision number.
    pub version: u64,
    /// Human-readable name.
    pub name: String,
    /// Optional human-readable description.
    #[serde(default)]
    pub description: Option<String>,
    /// Every node in the graph, keyed by id for O(1) dispatch lookup.
    pub nodes: HashMap<NodeId, WorkflowNode>,
    /// Entry point; must resolve in `nodes` (spec §3 invariant 1).
    pub start_node: NodeId,
    /// Seed values merged into the execution context's `variables` at start.
    #[serde(default)]
    pub variables: Value,
    /// Free-form metadata, not interpreted by the engine.
    #[serde(default)]
    pub metadata: Value,
    /// Present iff this workflow is deployable as a trigger target.
    #[serde(default)]
    pub trigger: Option<TriggerBinding>,
}

impl WorkflowDefinition {
    /// Build a definition from its nodes, validating nothing yet — callers
    /// should run [`crate::validate::validate`] before handing this to the
    /// engine.
    #[must_use]
    pub fn new(
        id: WorkflowId,
        name: impl Into<String>,
        start_node: NodeId,
        nodes: impl IntoIterator<Item = WorkflowNode>,
    ) -> Self {
        Self {
            id,
            version: 1,
            name: name.into(),
            description: None,
            nodes: nodes.into_iter().map(|node| (node.id, node)).collect(),
            start_node,
            variables: Value::Null,
            metadata: Value::Null,
            trigger: None,
        }
    }

    /// Attach seed variables.
    #[must_use]
    pub fn with_variables(mut self, variables: Value) -> Self {
        self.variables = variables;
        self
    }

    /// Attach a trigger binding.
    #[must_use]
    pub fn with_trigger(mut self, trigger: TriggerBinding) -> Self {
        self.trigger = Some(trigger);
        self
    }

    /// Look up a node by id.
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&WorkflowNode> {
        self.nodes.get(&id)
    }
}
