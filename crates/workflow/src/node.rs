//! Workflow node types (spec §3, §9 redesign note — tagged variant in
//! place of an untyped config bag).

use conduit_core::{NodeId, WorkflowId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::predicate::ConditionPredicate;

/// A node's successor reference, serialized as either a single id, a JSON
/// array of ids, or omitted entirely (spec §3: "one id, list, or none").
///
/// Only the first element is ever dispatched to (spec §4.3: "if list, the
/// first id — sequential fan-out is via parallel nodes, not multi-`next`"),
/// but the flexible shape is preserved at the serialization boundary for
/// compatibility with hand-authored definitions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Successor(Vec<NodeId>);

impl Successor {
    /// No successor — a terminal node.
    #[must_use]
    pub fn none() -> Self {
        Self(Vec::new())
    }

    /// A single successor.
    #[must_use]
    pub fn one(id: NodeId) -> Self {
        Self(vec![id])
    }

    /// The id actually dispatched to, if any.
    #[must_use]
    pub fn primary(&self) -> Option<NodeId> {
        self.0.first().copied()
    }

    /// Every id named, in declaration order.
    #[must_use]
    pub fn ids(&self) -> &[NodeId] {
        &self.0
    }
}

impl Serialize for Successor {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self.0.as_slice() {
            [] => serializer.serialize_none(),
            [single] => single.serialize(serializer),
            many => many.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Successor {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Shape {
            None,
            One(NodeId),
            Many(Vec<NodeId>),
        }
        Ok(match Shape::deserialize(deserializer)? {
            Shape::None => Successor::none(),
            Shape::One(id) => Successor::one(id),
            Shape::Many(ids) => Successor(ids),
        })
    }
}

impl From<NodeId> for Successor {
    fn from(id: NodeId) -> Self {
        Self::one(id)
    }
}

/// A timeout attached to a `trigger`/await node (spec §3, §4.3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AwaitTimeout {
    /// Wall-clock duration to wait before timing out, in milliseconds.
    pub duration_ms: u64,
    /// Node to route to when the timeout fires. `None` fails the workflow
    /// with `Timeout`.
    pub on_timeout_node: Option<NodeId>,
}

/// Kind-specific node configuration (spec §3 "Kind-specific config";
/// replaces the source's untyped config bag per spec §9).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeKind {
    /// Invoke a registered procedure.
    Procedure {
        /// Must resolve in the registry (spec §3 invariant 3).
        procedure_name: String,
        /// Opaque config merged (lowest precedence) into the handler input.
        #[serde(default)]
        config: Value,
    },
    /// Branch on a predicate.
    Condition {
        /// Evaluated via closure if present, else the expression string.
        predicate: ConditionPredicate,
        /// Successor when the predicate is truthy.
        true_branch: NodeId,
        /// Successor when the predicate is falsy.
        false_branch: NodeId,
    },
    /// Fan out to independent concurrent sub-traversals.
    Parallel {
        /// Node ids launched concurrently, each its own sub-traversal.
        branches: Vec<NodeId>,
        /// Await all branches vs. return on first success.
        wait_for_all: bool,
    },
    /// No-op node kept for authoring clarity (spec §4.3).
    Sequential,
    /// Suspends the execution until a matching external event arrives.
    TriggerAwait {
        /// Event source this node waits on, e.g. `"orders"` (spec §6.3's
        /// inbound event descriptor is keyed by `(provider, eventType)`).
        provider: String,
        /// Event type this node waits for.
        event_type: String,
        /// Optional filter over `(payload, variables)`; non-matching
        /// events leave the paused entry registered (`ResumeRejected`).
        #[serde(default)]
        filter: Option<ConditionPredicate>,
        /// Optional wait timeout.
        #[serde(default)]
        timeout: Option<AwaitTimeout>,
        /// JSON Schema subset the resume payload must satisfy.
        #[serde(default)]
        output_schema: Option<Value>,
    },
    /// Recursively execute another workflow definition.
    Subworkflow {
        /// Target workflow id.
        workflow_id: WorkflowId,
        /// Maps parent variables into the child's initial variables.
        #[serde(default)]
        input_mapping: Value,
        /// Whether the child's output variables merge back into the parent.
        merge: bool,
    },
}

impl NodeKind {
    /// The dotted span-name suffix for this kind (spec §4.7:
    /// `workflow.node.<kind>`).
    #[must_use]
    pub fn span_suffix(&self) -> &'static str {
        match self {
            Self::Procedure { .. } => "procedure",
            Self::Condition { .. } => "condition",
            Self::Parallel { .. } => "parallel",
            Self::Sequential => "sequential",
            Self::TriggerAwait { .. } => "trigger_await",
            Self::Subworkflow { .. } => "subworkflow",
        }
    }
}

/// A single node in a workflow graph (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowNode {
    /// Unique within the owning workflow (spec §3 invariant 4).
    pub id: NodeId,
    /// Kind-specific behavior and configuration.
    #[serde(flatten)]
    pub kind: NodeKind,
    /// Default successor; unused by `Condition` (which has its own
    /// branches) but used by every other kind, including as the
    /// post-join successor of `Parallel`.
    #[serde(default)]
    pub next: Successor,
    /// Node to route to on node-level failure (spec §7).
    #[serde(default)]
    pub on_error: Option<NodeId>,
}

impl WorkflowNode {
    /// Construct a node with no successor and no error handler.
    #[must_use]
    pub fn new(id: NodeId, kind: NodeKind) -> Self {
        Self { id, kind, next: Successor::none(), on_error: None }
    }

    /// Set the default successor.
    #[must_use]
    pub fn with_next(mut self, next: impl Into<Successor>) -> Self {
        self.next = next.into();
        self
    }

    /// Set the error-handler successor.
    #[must_use]
    pub fn with_on_error(mut self, node_id: NodeId) -> Self {
        self.on_error = Some(node_id);
        self
    }
}
