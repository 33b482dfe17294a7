//! Structural invariant checks (spec §3 invariants 1-5).

use std::collections::{HashMap, HashSet};

use conduit_core::NodeId;
use conduit_error::{Result, WorkflowError};
use conduit_registry::Registry;
use petgraph::algo::is_cyclic_directed;
use petgraph::graph::DiGraph;

use crate::definition::WorkflowDefinition;
use crate::node::NodeKind;

/// Run every structural invariant spec.md §3 requires of a workflow
/// definition before it is handed to the engine: every successor id
/// resolves, every `procedure` node's name resolves in `registry`
/// (invariant 3), and the start node exists.
///
/// Node-id uniqueness (invariant 4) holds by construction — nodes are
/// keyed by id in a map — so it is not re-checked here.
pub fn validate(definition: &WorkflowDefinition, registry: &Registry) -> Result<()> {
    if !definition.nodes.contains_key(&definition.start_node) {
        return Err(WorkflowError::NodeNotFound(definition.start_node.to_string()));
    }

    for node in definition.nodes.values() {
        for target in referenced_nodes(node) {
            if !definition.nodes.contains_key(&target) {
                return Err(WorkflowError::NodeNotFound(target.to_string()));
            }
        }
        if let NodeKind::Procedure { procedure_name, .. } = &node.kind {
            if procedure_name.trim().is_empty() || !registry.has(procedure_name) {
                return Err(WorkflowError::ProcedureNotFound(procedure_name.clone()));
            }
        }
    }

    Ok(())
}

/// Every node id this node's config or successor fields reference.
fn referenced_nodes(node: &crate::node::WorkflowNode) -> Vec<NodeId> {
    let mut targets: Vec<NodeId> = node.next.ids().to_vec();
    if let Some(on_error) = node.on_error {
        targets.push(on_error);
    }
    match &node.kind {
        NodeKind::Condition { true_branch, false_branch, .. } => {
            targets.push(*true_branch);
            targets.push(*false_branch);
        }
        NodeKind::Parallel { branches, .. } => targets.extend(branches.iter().copied()),
        NodeKind::TriggerAwait { timeout, .. } => {
            if let Some(timeout) = timeout {
                if let Some(on_timeout) = timeout.on_timeout_node {
                    targets.push(on_timeout);
                }
            }
        }
        NodeKind::Procedure { .. } | NodeKind::Sequential | NodeKind::Subworkflow { .. } => {}
    }
    targets
}

/// Build a directed graph over the workflow's nodes — used for diagnostics
/// (e.g. detecting retry loops) since cycles are explicitly permitted by
/// the dispatch model and are not themselves a validation failure (spec §9:
/// "do not assume DAG").
#[must_use]
pub fn to_petgraph(definition: &WorkflowDefinition) -> DiGraph<NodeId, ()> {
    let mut graph = DiGraph::new();
    let mut indices = HashMap::new();
    for &id in definition.nodes.keys() {
        indices.insert(id, graph.add_node(id));
    }
    for node in definition.nodes.values() {
        let from = indices[&node.id];
        let mut seen = HashSet::new();
        for target in referenced_nodes(node) {
            if seen.insert(target) {
                if let Some(&to) = indices.get(&target) {
                    graph.add_edge(from, to, ());
                }
            }
        }
    }
    graph
}

/// Whether the workflow graph contains a cycle (e.g. a retry loop).
/// Informational only — spec §9 explicitly permits cycles.
#[must_use]
pub fn has_cycle(definition: &WorkflowDefinition) -> bool {
    is_cyclic_directed(&to_petgraph(definition))
}
