//! Per-call execution options (spec §4.3: "optional cancellation token, max
//! wall-clock budget, hooks for on node start/end").

use std::sync::Arc;

use conduit_core::NodeId;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

/// Called when a node is about to be dispatched.
pub type NodeStartHook = Arc<dyn Fn(NodeId) + Send + Sync>;
/// Called once a node's dispatch has produced an output.
pub type NodeEndHook = Arc<dyn Fn(NodeId, &Value) + Send + Sync>;

/// Tunable knobs for a single `execute`/`resume` call.
#[derive(Clone, Default)]
pub struct ExecutionOptions {
    /// Cancelled cooperatively at the next dispatch boundary (spec §5).
    /// `None` means this call cannot be cancelled externally.
    pub cancellation: Option<CancellationToken>,
    /// Workflow-wide wall-clock budget in milliseconds; behaves as
    /// cancellation when it elapses (spec §5).
    pub max_wall_clock_ms: Option<u64>,
    /// Observability hook fired before a node is dispatched.
    pub on_node_start: Option<NodeStartHook>,
    /// Observability hook fired after a node produces an output.
    pub on_node_end: Option<NodeEndHook>,
    /// Whether to retain the collected span tree on [`crate::ExecutionResult`].
    pub collect_spans: bool,
}

impl ExecutionOptions {
    /// Options with every knob at its default (no cancellation, no budget,
    /// no hooks, spans dropped after the run).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a cancellation token.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Attach a wall-clock budget.
    #[must_use]
    pub fn with_max_wall_clock_ms(mut self, millis: u64) -> Self {
        self.max_wall_clock_ms = Some(millis);
        self
    }

    /// Attach a node-start hook.
    #[must_use]
    pub fn with_on_node_start<F>(mut self, hook: F) -> Self
    where
        F: Fn(NodeId) + Send + Sync + 'static,
    {
        self.on_node_start = Some(Arc::new(hook));
        self
    }

    /// Attach a node-end hook.
    #[must_use]
    pub fn with_on_node_end<F>(mut self, hook: F) -> Self
    where
        F: Fn(NodeId, &Value) + Send + Sync + 'static,
    {
        self.on_node_end = Some(Arc::new(hook));
        self
    }

    /// Retain the collected span tree on the returned [`crate::ExecutionResult`].
    #[must_use]
    pub fn with_spans_collected(mut self) -> Self {
        self.collect_spans = true;
        self
    }

    /// The cancellation token to actually observe this run, creating a
    /// fresh one if the caller supplied none.
    pub(crate) fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn hooks_are_invoked_with_the_right_arguments() {
        let started = Arc::new(AtomicUsize::new(0));
        let started_ref = started.clone();
        let options = ExecutionOptions::new().with_on_node_start(move |_node| {
            started_ref.fetch_add(1, Ordering::SeqCst);
        });
        (options.on_node_start.unwrap())(NodeId::v4());
        assert_eq!(started.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn default_cancellation_token_is_not_cancelled() {
        let options = ExecutionOptions::new();
        assert!(!options.cancellation_token().is_cancelled());
    }
}
