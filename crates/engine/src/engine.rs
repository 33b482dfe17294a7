//! The public workflow engine entry points: `execute` and `resume` (spec
//! §4.3).
//!
//! Grounded on the teacher's `nebula_engine::engine::WorkflowEngine`: build
//! context, validate, init state, open a root span, dispatch, emit the
//! terminal event, return a result. The level-by-level `JoinSet` fan-out
//! the teacher uses for its DAG moves down into `dispatch::dispatch_parallel`
//! here, since this graph's concurrency is scoped to individual `parallel`
//! nodes rather than whole dependency levels.

use std::sync::Arc;
use std::time::Instant;

use conduit_core::{now_millis, ExecutionId, NodeId, WorkflowId};
use conduit_error::WorkflowError;
use conduit_eventbus::{Event, EventBus};
use conduit_execution::{
    ExecutionStatus, ExecutionStore, PausedExecution, ResumeState, SubscriptionRegistry,
};
use conduit_registry::Registry;
use conduit_telemetry::SpanCollector;
use conduit_workflow::{validate, WorkflowDefinition};
use serde_json::Value;

use crate::config::EngineConfig;
use crate::directory::WorkflowDirectory;
use crate::dispatch::{self, merge_variables, to_typed_node_outputs, Ctx, Outcome, TraversalState};
use crate::error::{EngineError, Result};
use crate::options::ExecutionOptions;
use crate::result::{ExecutionFailure, ExecutionResult};

/// Shared infrastructure one engine runs every execution against: the
/// event bus executions publish lifecycle events to, the bounded history
/// they're recorded in, the paused-execution subscriptions pause/resume
/// routes through, and the directory `subworkflow` nodes resolve against.
pub struct WorkflowEngine {
    event_bus: Arc<EventBus>,
    store: Arc<ExecutionStore>,
    subscriptions: Arc<SubscriptionRegistry>,
    workflows: Arc<WorkflowDirectory>,
    config: EngineConfig,
}

impl WorkflowEngine {
    /// Build an engine over shared state the caller owns the lifetime of,
    /// so it can be inspected independently (an API layer listing
    /// executions, a trigger manager deploying workflows).
    #[must_use]
    pub fn new(
        event_bus: Arc<EventBus>,
        store: Arc<ExecutionStore>,
        subscriptions: Arc<SubscriptionRegistry>,
        workflows: Arc<WorkflowDirectory>,
    ) -> Self {
        Self { event_bus, store, subscriptions, workflows, config: EngineConfig::default() }
    }

    /// Override the engine-wide ambient config (spec §1: no default
    /// node timeout out of the box).
    #[must_use]
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// The shared event bus.
    #[must_use]
    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }

    /// The shared execution history.
    #[must_use]
    pub fn store(&self) -> &Arc<ExecutionStore> {
        &self.store
    }

    /// The shared paused-execution subscription registry.
    #[must_use]
    pub fn subscriptions(&self) -> &Arc<SubscriptionRegistry> {
        &self.subscriptions
    }

    /// The shared subworkflow-lookup directory.
    #[must_use]
    pub fn workflows(&self) -> &Arc<WorkflowDirectory> {
        &self.workflows
    }

    /// Start a fresh execution of `definition` from its start node (spec
    /// §4.3).
    pub async fn execute(
        &self,
        definition: Arc<WorkflowDefinition>,
        registry: Arc<Registry>,
        initial_input: Value,
        options: ExecutionOptions,
    ) -> Result<ExecutionResult> {
        validate::validate(&definition, &registry).map_err(EngineError::from)?;

        let execution_id = ExecutionId::v4();
        let start_node = definition.start_node;
        let mut variables = definition.variables.clone();
        merge_variables(&mut variables, &initial_input);
        let state = TraversalState::new(variables, initial_input);

        self.run_from(execution_id, definition, registry, start_node, state, options).await
    }

    /// Continue a paused execution with an inbound event payload (spec
    /// §4.3 step "resume"; §4.4 routes into this).
    ///
    /// The filter predicate and `outputSchema` are applied by the caller
    /// (the trigger manager) before a resume attempt reaches here — by the
    /// time a [`ResumeState`] arrives, the event has already been accepted.
    pub async fn resume(
        &self,
        definition: Arc<WorkflowDefinition>,
        registry: Arc<Registry>,
        resume_state: ResumeState,
        event_payload: Value,
        options: ExecutionOptions,
    ) -> Result<ExecutionResult> {
        let execution_id = resume_state.execution_id;
        let await_node = resume_state.current_node;

        self.event_bus.publish(Event::WorkflowResumed { execution_id, node_id: await_node });

        let mut variables = resume_state.variables;
        merge_variables(&mut variables, &event_payload);

        let mut state = TraversalState::new(variables, event_payload.clone());
        state.nodes_executed = resume_state.nodes_executed;
        state.node_outputs =
            resume_state.node_outputs.into_iter().map(|(id, v)| (id.to_string(), v)).collect();
        state.node_outputs.insert(await_node.to_string(), event_payload);

        let next = definition.node(await_node).and_then(|node| node.next.primary());
        let Some(next) = next else {
            let spans = Arc::new(SpanCollector::new());
            return self
                .finish(
                    execution_id,
                    definition.id,
                    Outcome::Completed,
                    state,
                    &options,
                    Instant::now(),
                    spans,
                )
                .await;
        };

        self.run_from(execution_id, definition, registry, next, state, options).await
    }

    async fn run_from(
        &self,
        execution_id: ExecutionId,
        definition: Arc<WorkflowDefinition>,
        registry: Arc<Registry>,
        start: NodeId,
        mut state: TraversalState,
        options: ExecutionOptions,
    ) -> Result<ExecutionResult> {
        tracing::debug!(%execution_id, workflow_id = %definition.id, "execution starting");
        self.store.start(execution_id, definition.id);
        self.store.set_status(execution_id, ExecutionStatus::Running);
        self.event_bus.publish(Event::WorkflowStarted { execution_id, workflow_id: definition.id });

        let spans = Arc::new(SpanCollector::new());
        let root_span = spans.start_span("workflow.execute", Default::default(), None);
        let started_at = Instant::now();

        let ctx = Ctx {
            definition: definition.clone(),
            registry,
            event_bus: self.event_bus.clone(),
            store: self.store.clone(),
            spans: spans.clone(),
            workflows: self.workflows.clone(),
            execution_id,
            workflow_id: definition.id,
            cancel: options.cancellation_token(),
            options: Arc::new(options.clone()),
            default_await_timeout_ms: self.config.default_await_timeout_ms,
        };

        let outcome = dispatch::run(&ctx, &mut state, start, root_span).await;
        spans.end_span(root_span, span_status_for(&outcome));

        self.finish(execution_id, definition.id, outcome, state, &options, started_at, spans).await
    }

    #[allow(clippy::too_many_arguments)]
    async fn finish(
        &self,
        execution_id: ExecutionId,
        workflow_id: WorkflowId,
        outcome: Outcome,
        state: TraversalState,
        options: &ExecutionOptions,
        started_at: Instant,
        spans: Arc<SpanCollector>,
    ) -> Result<ExecutionResult> {
        let execution_time_ms = started_at.elapsed().as_millis() as i64;
        let nodes_executed = state.nodes_executed.clone();

        let (status, error, resume_state) = match outcome {
            Outcome::Completed => (ExecutionStatus::Completed, None, None),
            Outcome::Cancelled => (ExecutionStatus::Cancelled, None, None),
            Outcome::Failed(err) => {
                let engine_error = EngineError::from(err);
                (ExecutionStatus::Failed, Some(ExecutionFailure::from_error(&engine_error)), None)
            }
            Outcome::Paused(info) => {
                let resume_state = ResumeState {
                    workflow_id,
                    execution_id,
                    current_node: info.node_id,
                    variables: state.variables.clone(),
                    node_outputs: to_typed_node_outputs(&state.node_outputs),
                    nodes_executed: nodes_executed.clone(),
                };
                self.subscriptions.register(PausedExecution {
                    execution_id,
                    workflow_id,
                    paused_at: info.node_id,
                    criteria: info.criteria,
                    resume_state: resume_state.clone(),
                    paused_since_ms: now_millis(),
                    timeout_deadline_ms: info.timeout_deadline_ms,
                    waiting_for: info.waiting_for.clone(),
                });
                self.event_bus.publish(Event::WorkflowPaused {
                    execution_id,
                    node_id: info.node_id,
                    waiting_for: info.waiting_for,
                });
                (ExecutionStatus::Paused, None, Some(resume_state))
            }
        };

        tracing::debug!(%execution_id, %status, "execution finished");
        self.store.set_status(execution_id, status);
        if status.is_terminal() {
            self.store.complete(execution_id, status, error.as_ref().map(|e| e.message.clone()));
        }

        match status {
            ExecutionStatus::Completed => {
                self.event_bus
                    .publish(Event::WorkflowCompleted { execution_id, duration_ms: execution_time_ms });
            }
            ExecutionStatus::Failed => {
                let message = error.as_ref().map(|e| e.message.clone()).unwrap_or_default();
                self.event_bus.publish(Event::WorkflowFailed { execution_id, error: message });
            }
            _ => {}
        }

        let result = ExecutionResult {
            execution_id,
            status,
            outputs: state.node_outputs,
            execution_time_ms,
            nodes_executed,
            spans: options.collect_spans.then(|| spans.snapshot()),
            error,
            resume_state,
        };

        // `WorkflowResult` is terminal (event.rs: `Event::is_terminal`) and its
        // publication closes the execution's event-bus topic — never send it for
        // a `Paused` execution, which a live subscriber still needs to hear
        // `workflow.resumed`/`node.*` events on after `resume` continues it.
        if status.is_terminal() {
            self.event_bus.publish(Event::WorkflowResult {
                execution_id,
                result: serde_json::to_value(&result).unwrap_or(Value::Null),
            });
        }

        Ok(result)
    }
}

fn span_status_for(outcome: &Outcome) -> conduit_telemetry::SpanStatus {
    match outcome {
        Outcome::Completed | Outcome::Paused(_) => conduit_telemetry::SpanStatus::ok(),
        Outcome::Cancelled => conduit_telemetry::SpanStatus::error("cancelled"),
        Outcome::Failed(err) => conduit_telemetry::SpanStatus::error(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use conduit_core::NodeId;
    use conduit_registry::{InvocationContext, Procedure, ProcedureMetadata};
    use conduit_workflow::{NodeKind, WorkflowNode};
    use pretty_assertions::assert_eq;

    struct Echo;

    #[async_trait]
    impl Procedure for Echo {
        fn metadata(&self) -> &ProcedureMetadata {
            static META: std::sync::OnceLock<ProcedureMetadata> = std::sync::OnceLock::new();
            META.get_or_init(|| ProcedureMetadata::new("test.echo"))
        }

        async fn invoke(
            &self,
            input: Value,
            _context: &InvocationContext,
        ) -> std::result::Result<Value, String> {
            Ok(input)
        }
    }

    fn engine() -> WorkflowEngine {
        WorkflowEngine::new(
            Arc::new(EventBus::default()),
            Arc::new(ExecutionStore::default()),
            Arc::new(SubscriptionRegistry::new()),
            Arc::new(WorkflowDirectory::new()),
        )
    }

    fn registry_with_echo() -> Arc<Registry> {
        let registry = Registry::new();
        registry.register(Arc::new(Echo)).unwrap();
        Arc::new(registry)
    }

    #[tokio::test]
    async fn single_procedure_node_completes() {
        let start = NodeId::v4();
        let nodes = vec![WorkflowNode::new(
            start,
            NodeKind::Procedure { procedure_name: "test.echo".into(), config: Value::Null },
        )];
        let definition =
            Arc::new(WorkflowDefinition::new(WorkflowId::v4(), "single", start, nodes));

        let result = engine()
            .execute(definition, registry_with_echo(), serde_json::json!({"n": 1}), ExecutionOptions::new())
            .await
            .unwrap();

        assert!(result.is_success());
        assert_eq!(result.outputs[&start.to_string()], serde_json::json!({"n": 1}));
    }

    #[tokio::test]
    async fn missing_start_node_is_rejected_before_running() {
        let definition = Arc::new(WorkflowDefinition::new(
            WorkflowId::v4(),
            "broken",
            NodeId::v4(),
            Vec::<WorkflowNode>::new(),
        ));

        let err = engine()
            .execute(definition, registry_with_echo(), Value::Null, ExecutionOptions::new())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Workflow(WorkflowError::NodeNotFound(_))));
    }
}
