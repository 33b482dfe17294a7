//! Lookup for other workflows a `subworkflow` node may target.
//!
//! `conduit-engine` executes one definition at a time handed to it by the
//! caller (spec §4.3: `execute(definition, ...)`); `subworkflow` nodes need
//! a second definition by id, which the Library Loader (spec §4.8) is the
//! one responsible for keeping current. This directory is the seam between
//! the two: the loader populates it, the engine only reads it.

use std::sync::Arc;

use conduit_core::WorkflowId;
use conduit_workflow::WorkflowDefinition;
use dashmap::DashMap;

/// Concurrent id → definition map handed to a [`crate::engine::WorkflowEngine`]
/// so it can resolve `subworkflow` targets.
#[derive(Default)]
pub struct WorkflowDirectory {
    workflows: DashMap<WorkflowId, Arc<WorkflowDefinition>>,
}

impl WorkflowDirectory {
    /// Create an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace a workflow definition.
    pub fn insert(&self, definition: Arc<WorkflowDefinition>) {
        self.workflows.insert(definition.id, definition);
    }

    /// Look up a definition by id.
    #[must_use]
    pub fn get(&self, id: WorkflowId) -> Option<Arc<WorkflowDefinition>> {
        self.workflows.get(&id).map(|entry| entry.value().clone())
    }

    /// Remove a definition by id.
    pub fn remove(&self, id: WorkflowId) -> Option<Arc<WorkflowDefinition>> {
        self.workflows.remove(&id).map(|(_, def)| def)
    }

    /// Number of registered definitions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.workflows.len()
    }

    /// Whether the directory is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.workflows.is_empty()
    }
}
