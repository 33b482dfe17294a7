//! Per-node dispatch rules and the traversal loop built on top of them
//! (spec §4.3 "Node dispatch").
//!
//! Grounded on the teacher's level-by-level traversal in
//! `nebula_engine::engine::WorkflowEngine::run_levels`/`spawn_level`, adapted
//! from a DAG/level model to the per-node `next`/`trueBranch`/`falseBranch`/
//! `branches` successor model this graph uses (cycles are allowed, spec §9).

use std::collections::HashMap;
use std::sync::Arc;

use conduit_core::{now_millis, ExecutionId, NodeId, SpanId, WorkflowId};
use conduit_error::WorkflowError;
use conduit_eventbus::{Event, EventBus};
use conduit_execution::{ExecutionStore, NodeDetail, NodeStatus, ResumeCriteria, ResumeState};
use conduit_expression::Expression;
use conduit_registry::{Executor, InvocationContext, Registry};
use conduit_telemetry::{Attributes, SpanCollector, SpanStatus};
use conduit_workflow::{AwaitTimeout, ConditionPredicate, NodeKind, WorkflowDefinition, WorkflowNode};
use serde_json::Value;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::directory::WorkflowDirectory;
use crate::options::ExecutionOptions;

/// Everything a single traversal (the top-level execution, a parallel
/// branch, or a subworkflow child) needs to dispatch nodes. Cheap to clone —
/// every field is an `Arc` or a small `Copy` value — so forking for
/// `parallel` branches is just a struct update with a child cancellation
/// token.
#[derive(Clone)]
pub(crate) struct Ctx {
    pub(crate) definition: Arc<WorkflowDefinition>,
    pub(crate) registry: Arc<Registry>,
    pub(crate) event_bus: Arc<EventBus>,
    pub(crate) store: Arc<ExecutionStore>,
    pub(crate) spans: Arc<SpanCollector>,
    pub(crate) workflows: Arc<WorkflowDirectory>,
    pub(crate) execution_id: ExecutionId,
    pub(crate) workflow_id: WorkflowId,
    pub(crate) cancel: CancellationToken,
    pub(crate) options: Arc<ExecutionOptions>,
    /// Fallback for a `trigger`/await node with no `timeout` of its own
    /// (spec §1 ambient config: [`crate::EngineConfig::default_await_timeout_ms`]).
    pub(crate) default_await_timeout_ms: Option<u64>,
}

/// Variables, node outputs, and traversal history local to one traversal.
///
/// `node_outputs` is keyed by string rather than [`NodeId`] so a `parallel`
/// join can merge branch-local outputs in under the synthetic
/// `"<parallelNodeId>.<branchNodeId>"` alias (spec §4.3) alongside
/// ordinary `node_id.to_string()` keys.
pub(crate) struct TraversalState {
    pub(crate) variables: Value,
    pub(crate) node_outputs: HashMap<String, Value>,
    pub(crate) nodes_executed: Vec<NodeId>,
    /// The traversal's initial input, unchanged for its whole lifetime —
    /// exposed to condition predicates as `inputData` (spec §4.3) distinct
    /// from the mutable `variables` map.
    pub(crate) input: Value,
}

impl TraversalState {
    pub(crate) fn new(variables: Value, input: Value) -> Self {
        Self { variables, node_outputs: HashMap::new(), nodes_executed: Vec::new(), input }
    }
}

/// Resume-relevant detail captured when a traversal pauses on a
/// `trigger`/await node (spec §4.3 step "Register a subscription...").
pub(crate) struct PauseInfo {
    pub(crate) node_id: NodeId,
    pub(crate) criteria: ResumeCriteria,
    pub(crate) timeout_deadline_ms: Option<i64>,
    pub(crate) waiting_for: Vec<String>,
    /// Set when this pause bubbled up from a `subworkflow` child (spec §8:
    /// "a subworkflow whose child pauses: parent pauses with nested resume
    /// state").
    pub(crate) nested: Option<Box<ResumeState>>,
}

/// How a traversal ended.
pub(crate) enum Outcome {
    Completed,
    Paused(PauseInfo),
    Failed(WorkflowError),
    Cancelled,
}

enum StepOutcome {
    Next(Option<NodeId>),
    Pause(PauseInfo),
}

/// Run nodes starting at `start` until the traversal reaches a terminal
/// node, pauses, fails, or is cancelled (spec §4.3 state machine).
pub(crate) async fn run(
    ctx: &Ctx,
    state: &mut TraversalState,
    start: NodeId,
    parent_span: SpanId,
) -> Outcome {
    let mut current = Some(start);
    loop {
        let Some(node_id) = current else {
            return Outcome::Completed;
        };
        if ctx.cancel.is_cancelled() {
            return Outcome::Cancelled;
        }
        let Some(node) = ctx.definition.node(node_id).cloned() else {
            return Outcome::Failed(WorkflowError::NodeNotFound(node_id.to_string()));
        };

        state.nodes_executed.push(node_id);
        if let Some(hook) = &ctx.options.on_node_start {
            hook(node_id);
        }
        ctx.event_bus.publish(Event::NodeStarted { execution_id: ctx.execution_id, node_id });

        let dispatch_start_ms = now_millis();
        let input_snapshot = state.variables.clone();
        ctx.store.update_node(
            ctx.execution_id,
            NodeDetail {
                node_id,
                status: NodeStatus::Running,
                start_ms: dispatch_start_ms,
                end_ms: None,
                input_snapshot: input_snapshot.clone(),
                output_snapshot: None,
                error: None,
            },
        );

        let mut attrs = Attributes::new();
        attrs.insert("node.id".into(), node_id.to_string().into());
        let span_id = ctx.spans.start_span(
            format!("workflow.node.{}", node.kind.span_suffix()),
            attrs,
            Some(parent_span),
        );

        match dispatch_node(ctx, &node, state, span_id).await {
            Ok(step) => {
                let output = state.node_outputs.get(&node_id.to_string()).cloned().unwrap_or(Value::Null);
                ctx.spans.end_span(span_id, SpanStatus::ok());
                ctx.event_bus.publish(Event::NodeCompleted {
                    execution_id: ctx.execution_id,
                    node_id,
                    output: output.clone(),
                });
                ctx.store.update_node(
                    ctx.execution_id,
                    NodeDetail {
                        node_id,
                        status: NodeStatus::Completed,
                        start_ms: dispatch_start_ms,
                        end_ms: Some(now_millis()),
                        input_snapshot,
                        output_snapshot: Some(output.clone()),
                        error: None,
                    },
                );
                if let Some(hook) = &ctx.options.on_node_end {
                    hook(node_id, &output);
                }
                match step {
                    StepOutcome::Next(next) => current = next,
                    StepOutcome::Pause(info) => return Outcome::Paused(info),
                }
            }
            Err(err) => {
                ctx.spans.record_exception(span_id, err.to_string());
                ctx.store.update_node(
                    ctx.execution_id,
                    NodeDetail {
                        node_id,
                        status: NodeStatus::Failed,
                        start_ms: dispatch_start_ms,
                        end_ms: Some(now_millis()),
                        input_snapshot,
                        output_snapshot: None,
                        error: Some(err.to_string()),
                    },
                );
                if matches!(err, WorkflowError::Cancelled) {
                    return Outcome::Cancelled;
                }
                if err.recoverable_to_on_error() {
                    if let Some(on_error) = node.on_error {
                        current = Some(on_error);
                        continue;
                    }
                }
                return Outcome::Failed(err);
            }
        }
    }
}

async fn dispatch_node(
    ctx: &Ctx,
    node: &WorkflowNode,
    state: &mut TraversalState,
    span_id: SpanId,
) -> Result<StepOutcome, WorkflowError> {
    match &node.kind {
        NodeKind::Procedure { procedure_name, config } => {
            dispatch_procedure(ctx, node, procedure_name, config, state, span_id).await
        }
        NodeKind::Condition { predicate, true_branch, false_branch } => {
            dispatch_condition(ctx, node, predicate, *true_branch, *false_branch, state, span_id)
        }
        NodeKind::Parallel { branches, wait_for_all } => {
            dispatch_parallel(ctx, node, branches, *wait_for_all, state, span_id).await
        }
        NodeKind::Sequential => Ok(StepOutcome::Next(node.next.primary())),
        NodeKind::Subworkflow { workflow_id, input_mapping, merge } => {
            dispatch_subworkflow(ctx, node, *workflow_id, input_mapping, *merge, state, span_id).await
        }
        NodeKind::TriggerAwait { provider, event_type, filter, timeout, .. } => {
            dispatch_trigger_await(node, provider, event_type, filter, timeout, ctx.default_await_timeout_ms)
        }
    }
}

async fn dispatch_procedure(
    ctx: &Ctx,
    node: &WorkflowNode,
    procedure_name: &str,
    config: &Value,
    state: &mut TraversalState,
    span_id: SpanId,
) -> Result<StepOutcome, WorkflowError> {
    let input = merge_procedure_input(config, &state.variables);
    let request_id = format!("{}:{}", ctx.execution_id, node.id);
    let invocation_ctx = InvocationContext::new(request_id, "workflow").with_parent_span(span_id);
    let executor = Executor::new(&ctx.registry, &ctx.event_bus, &ctx.spans);
    let output = executor.invoke(procedure_name, input, &invocation_ctx, Some(span_id)).await?;
    state.node_outputs.insert(node.id.to_string(), output.clone());
    merge_variables(&mut state.variables, &output);
    Ok(StepOutcome::Next(node.next.primary()))
}

fn dispatch_condition(
    ctx: &Ctx,
    node: &WorkflowNode,
    predicate: &ConditionPredicate,
    true_branch: NodeId,
    false_branch: NodeId,
    state: &TraversalState,
    span_id: SpanId,
) -> Result<StepOutcome, WorkflowError> {
    let scope = condition_scope(state);
    let result = evaluate_predicate(node.id, predicate, &scope)?;
    ctx.spans.set_attribute(span_id, "condition.result", result.into());
    let branch = if result { true_branch } else { false_branch };
    ctx.spans.set_attribute(span_id, "condition.branch_taken", branch.to_string().into());
    if let Some(source) = predicate.as_expression() {
        ctx.spans.set_attribute(span_id, "condition.expression", source.to_string().into());
    }
    Ok(StepOutcome::Next(Some(branch)))
}

#[allow(clippy::too_many_arguments)]
async fn dispatch_parallel(
    ctx: &Ctx,
    node: &WorkflowNode,
    branches: &[NodeId],
    wait_for_all: bool,
    state: &mut TraversalState,
    span_id: SpanId,
) -> Result<StepOutcome, WorkflowError> {
    if branches.is_empty() {
        return Ok(StepOutcome::Next(node.next.primary()));
    }

    // A child token: cancelling it never reaches back up to `ctx.cancel`,
    // but it does let us stop waiting on the remaining branches once one
    // has settled (spec §4.3: "cancel the remaining branches").
    let branch_cancel = ctx.cancel.child_token();
    let mut join_set = JoinSet::new();
    for &branch_start in branches {
        let branch_ctx = Ctx { cancel: branch_cancel.clone(), ..ctx.clone() };
        let variables_snapshot = state.variables.clone();
        let input_snapshot = state.input.clone();
        join_set.spawn(async move {
            let mut branch_state = TraversalState::new(variables_snapshot, input_snapshot);
            let outcome = run(&branch_ctx, &mut branch_state, branch_start, span_id).await;
            (branch_start, branch_state, outcome)
        });
    }

    let mut completed = Vec::new();
    let mut first_error: Option<WorkflowError> = None;
    while let Some(joined) = join_set.join_next().await {
        match joined {
            Ok((_, branch_state, Outcome::Completed)) => {
                completed.push(branch_state);
                if !wait_for_all {
                    branch_cancel.cancel();
                    break;
                }
            }
            Ok((_, _, Outcome::Failed(err))) => {
                first_error = Some(err);
                branch_cancel.cancel();
                break;
            }
            Ok((_, _, Outcome::Cancelled)) => {
                if ctx.cancel.is_cancelled() {
                    break;
                }
            }
            Ok((branch_start, _, Outcome::Paused(_))) => {
                first_error = Some(WorkflowError::HandlerError {
                    node: Some(branch_start),
                    message: "a parallel branch cannot pause on a trigger/await node".into(),
                });
                branch_cancel.cancel();
                break;
            }
            Err(join_err) => {
                first_error =
                    Some(WorkflowError::HandlerError { node: None, message: join_err.to_string() });
                branch_cancel.cancel();
                break;
            }
        }
    }
    // Remaining branches keep running to completion in the background —
    // detached, not killed, matching the engine's cancellation policy.
    drop(join_set);

    if let Some(err) = first_error {
        return Err(err);
    }
    if ctx.cancel.is_cancelled() {
        return Err(WorkflowError::Cancelled);
    }

    for branch_state in &completed {
        for (key, value) in &branch_state.node_outputs {
            state.node_outputs.insert(format!("{}.{}", node.id, key), value.clone());
        }
    }

    Ok(StepOutcome::Next(node.next.primary()))
}

async fn dispatch_subworkflow(
    ctx: &Ctx,
    node: &WorkflowNode,
    workflow_id: WorkflowId,
    input_mapping: &Value,
    merge: bool,
    state: &mut TraversalState,
    span_id: SpanId,
) -> Result<StepOutcome, WorkflowError> {
    let child_def = ctx
        .workflows
        .get(workflow_id)
        .ok_or_else(|| WorkflowError::NodeNotFound(format!("subworkflow target {workflow_id}")))?;

    let child_variables = merge_procedure_input(input_mapping, &state.variables);
    let child_start = child_def.start_node;
    let child_ctx = Ctx { definition: child_def.clone(), workflow_id, ..ctx.clone() };
    let mut child_state = TraversalState::new(child_variables.clone(), child_variables);
    let outcome = run(&child_ctx, &mut child_state, child_start, span_id).await;

    match outcome {
        Outcome::Completed => {
            if merge {
                merge_variables(&mut state.variables, &child_state.variables);
            }
            let child_outputs: serde_json::Map<String, Value> = child_state.node_outputs.into_iter().collect();
            state.node_outputs.insert(node.id.to_string(), Value::Object(child_outputs));
            Ok(StepOutcome::Next(node.next.primary()))
        }
        Outcome::Failed(err) => Err(err),
        Outcome::Cancelled => Err(WorkflowError::Cancelled),
        Outcome::Paused(mut info) => {
            let nested = ResumeState {
                workflow_id: child_def.id,
                execution_id: ctx.execution_id,
                current_node: info.node_id,
                variables: child_state.variables,
                node_outputs: to_typed_node_outputs(&child_state.node_outputs),
                nodes_executed: child_state.nodes_executed,
            };
            info.nested = Some(Box::new(nested));
            info.node_id = node.id;
            Ok(StepOutcome::Pause(info))
        }
    }
}

fn dispatch_trigger_await(
    node: &WorkflowNode,
    provider: &str,
    event_type: &str,
    filter: &Option<ConditionPredicate>,
    timeout: &Option<AwaitTimeout>,
    default_timeout_ms: Option<u64>,
) -> Result<StepOutcome, WorkflowError> {
    let duration_ms = timeout.as_ref().map(|t| t.duration_ms).or(default_timeout_ms);
    let timeout_deadline_ms = duration_ms.map(|ms| now_millis() + ms as i64);
    Ok(StepOutcome::Pause(PauseInfo {
        node_id: node.id,
        criteria: ResumeCriteria {
            provider: provider.to_string(),
            event_type: event_type.to_string(),
            filter: filter.clone(),
        },
        timeout_deadline_ms,
        waiting_for: vec![event_type.to_string()],
        nested: None,
    }))
}

fn condition_scope(state: &TraversalState) -> Value {
    let outputs: serde_json::Map<String, Value> =
        state.node_outputs.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
    serde_json::json!({
        "vars": state.variables,
        "outputs": Value::Object(outputs),
        "input": state.input,
    })
}

fn evaluate_predicate(
    node_id: NodeId,
    predicate: &ConditionPredicate,
    scope: &Value,
) -> Result<bool, WorkflowError> {
    match predicate {
        ConditionPredicate::Closure(f) => Ok(f(scope)),
        ConditionPredicate::Expression(source) => {
            let expr = Expression::parse(source)
                .map_err(|e| WorkflowError::HandlerError { node: Some(node_id), message: e.to_string() })?;
            expr.evaluate_bool(scope)
                .map_err(|e| WorkflowError::HandlerError { node: Some(node_id), message: e.to_string() })
        }
    }
}

/// Build a procedure's handler input: `config` is the base (lowest
/// precedence), `variables` overlays it, and `config.mapping` — an object of
/// dotted variable paths — resolves and overlays last (spec §4.3: "merging
/// ... node config, then current variables, then any explicit mapping in
/// config").
fn merge_procedure_input(config: &Value, variables: &Value) -> Value {
    let mut merged = config.as_object().cloned().unwrap_or_default();
    let mapping = merged.remove("mapping");

    if let Some(vars_obj) = variables.as_object() {
        for (k, v) in vars_obj {
            merged.insert(k.clone(), v.clone());
        }
    }

    if let Some(mapping_obj) = mapping.as_ref().and_then(Value::as_object) {
        for (k, path) in mapping_obj {
            if let Some(path_str) = path.as_str() {
                if let Some(resolved) = resolve_path(variables, path_str) {
                    merged.insert(k.clone(), resolved.clone());
                }
            }
        }
    }

    Value::Object(merged)
}

fn resolve_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(value, |acc, segment| acc.get(segment))
}

/// Shallow-merge `patch`'s top-level keys into `variables`, scalar-replacing
/// existing ones (spec §9 open question, resolved shallow).
pub(crate) fn merge_variables(variables: &mut Value, patch: &Value) {
    let Some(patch_obj) = patch.as_object() else { return };
    if !variables.is_object() {
        *variables = Value::Object(serde_json::Map::new());
    }
    let variables_obj = variables.as_object_mut().expect("just ensured object");
    for (k, v) in patch_obj {
        variables_obj.insert(k.clone(), v.clone());
    }
}

pub(crate) fn to_typed_node_outputs(map: &HashMap<String, Value>) -> HashMap<NodeId, Value> {
    map.iter().filter_map(|(k, v)| k.parse::<NodeId>().ok().map(|id| (id, v.clone()))).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_procedure_input_overlays_variables_over_config() {
        let config = serde_json::json!({"a": 1, "b": 2});
        let variables = serde_json::json!({"b": 20, "c": 30});
        let merged = merge_procedure_input(&config, &variables);
        assert_eq!(merged, serde_json::json!({"a": 1, "b": 20, "c": 30}));
    }

    #[test]
    fn merge_procedure_input_applies_mapping_last() {
        let config = serde_json::json!({"a": 1, "mapping": {"a": "nested.value"}});
        let variables = serde_json::json!({"a": 99, "nested": {"value": 7}});
        let merged = merge_procedure_input(&config, &variables);
        assert_eq!(merged, serde_json::json!({"a": 7}));
    }

    #[test]
    fn merge_variables_is_shallow_and_scalar_replacing() {
        let mut variables = serde_json::json!({"a": {"x": 1}, "b": 1});
        let patch = serde_json::json!({"a": {"x": 2}});
        merge_variables(&mut variables, &patch);
        assert_eq!(variables, serde_json::json!({"a": {"x": 2}, "b": 1}));
    }

    #[test]
    fn resolve_path_walks_dotted_segments() {
        let value = serde_json::json!({"a": {"b": {"c": 42}}});
        assert_eq!(resolve_path(&value, "a.b.c"), Some(&serde_json::json!(42)));
        assert_eq!(resolve_path(&value, "a.missing"), None);
    }
}
