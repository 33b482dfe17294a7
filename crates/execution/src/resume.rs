//! Paused-execution subscriptions and resume state (spec §3, §4.3, §4.4).

use std::collections::HashMap;

use conduit_core::{now_millis, EpochMillis, ExecutionId, NodeId, WorkflowId};
use conduit_workflow::ConditionPredicate;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Minimum state needed to continue a paused execution from its await node
/// (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResumeState {
    /// Workflow being executed.
    pub workflow_id: WorkflowId,
    /// The paused execution.
    pub execution_id: ExecutionId,
    /// The await node execution will continue from.
    pub current_node: NodeId,
    /// Variables as of the pause point.
    pub variables: Value,
    /// Flattened node-id → output map as of the pause point.
    pub node_outputs: HashMap<NodeId, Value>,
    /// Traversal history up to and including the await node.
    pub nodes_executed: Vec<NodeId>,
}

/// What an inbound event must match for a paused execution to resume
/// (spec §3, §6.3).
#[derive(Clone)]
pub struct ResumeCriteria {
    /// Event source, e.g. `"drive"`.
    pub provider: String,
    /// Event type the await node is waiting for.
    pub event_type: String,
    /// Evaluated against `(payload, variables)`; a rejection is a no-op
    /// resume attempt, not an error (spec §7: `ResumeRejected`).
    pub filter: Option<ConditionPredicate>,
}

/// A paused execution's subscription entry (spec §3).
#[derive(Clone)]
pub struct PausedExecution {
    /// The paused execution.
    pub execution_id: ExecutionId,
    /// Workflow being executed.
    pub workflow_id: WorkflowId,
    /// The await node execution is suspended at.
    pub paused_at: NodeId,
    /// What resumes this execution.
    pub criteria: ResumeCriteria,
    /// State to restore on resume.
    pub resume_state: ResumeState,
    /// When the pause began.
    pub paused_since_ms: EpochMillis,
    /// Deadline after which an unmatched wait routes to `onTimeout` or
    /// fails with `Timeout`.
    pub timeout_deadline_ms: Option<EpochMillis>,
    /// Event types this pause is waiting on, surfaced in `workflow.paused`.
    pub waiting_for: Vec<String>,
}

impl PausedExecution {
    /// Whether `timeout_deadline_ms` has passed.
    #[must_use]
    pub fn is_timed_out(&self, now_ms: EpochMillis) -> bool {
        self.timeout_deadline_ms.is_some_and(|deadline| now_ms >= deadline)
    }
}

/// Concurrency-safe index of paused executions, keyed by id and by
/// `(provider, event_type)` for routing inbound events (spec §4.3, §4.4,
/// §6.3).
///
/// Per spec §5, resume operations on the same execution must be
/// serialized — `DashMap`'s per-shard locking gives exactly that for any
/// single key without a separate mutex.
#[derive(Default)]
pub struct SubscriptionRegistry {
    by_execution: DashMap<ExecutionId, PausedExecution>,
}

impl SubscriptionRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a paused execution.
    pub fn register(&self, paused: PausedExecution) {
        self.by_execution.insert(paused.execution_id, paused);
    }

    /// Remove a paused execution by id — called on resume, cancel, or
    /// timeout (spec §3: "Lifecycle and ownership").
    pub fn remove(&self, execution_id: ExecutionId) -> Option<PausedExecution> {
        self.by_execution.remove(&execution_id).map(|(_, p)| p)
    }

    /// All paused executions matching `(provider, event_type)` whose
    /// filter predicate (if any) accepts `payload` (spec §6.3 step 1).
    ///
    /// Filter evaluation happens here so callers get only executions they
    /// should actually resume; a filter-rejecting match is indistinguishable
    /// from a non-match at this layer — the entry is simply omitted and
    /// stays registered.
    #[must_use]
    pub fn find_matching(
        &self,
        provider: &str,
        event_type: &str,
        payload: &Value,
    ) -> Vec<PausedExecution> {
        self.by_execution
            .iter()
            .filter(|entry| {
                let criteria = &entry.value().criteria;
                criteria.provider == provider && criteria.event_type == event_type
            })
            .filter(|entry| accepts(&entry.value().criteria, payload, &entry.value().resume_state.variables))
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Every paused execution whose timeout has elapsed as of `now_ms`.
    #[must_use]
    pub fn find_timed_out(&self, now_ms: EpochMillis) -> Vec<PausedExecution> {
        self.by_execution
            .iter()
            .filter(|entry| entry.value().is_timed_out(now_ms))
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Number of currently paused executions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_execution.len()
    }

    /// Whether no executions are currently paused.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_execution.is_empty()
    }
}

fn accepts(criteria: &ResumeCriteria, payload: &Value, variables: &Value) -> bool {
    let Some(filter) = &criteria.filter else {
        return true;
    };
    let Some(expression) = filter.as_expression() else {
        // Closure-form filters are evaluated by the engine directly against
        // its richer scope; the registry only sees the serializable form.
        return true;
    };
    let scope = serde_json::json!({ "evt": payload, "vars": variables });
    conduit_expression::Expression::parse(expression)
        .and_then(|compiled| compiled.evaluate_bool(&scope).map_err(Into::into))
        .unwrap_or(false)
}
