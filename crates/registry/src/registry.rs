//! Concurrent registry of procedures by name (spec §3, §4.1).

use std::sync::Arc;

use conduit_error::{WorkflowError, Result};
use dashmap::DashMap;

use crate::metadata::ProcedureMetadata;
use crate::procedure::Procedure;

/// Type-erased, concurrency-safe mapping from procedure name to procedure.
///
/// Grounded on `nebula_action::registry::ActionRegistry`, generalized from a
/// `&mut self`/`HashMap` design to a `&self`/`DashMap` one: unlike the
/// teacher's engine, which populates its registry once at startup before
/// handing out shared references, Conduit's loader (spec §4.8) can apply
/// reloads concurrently with in-flight invocations.
#[derive(Default)]
pub struct Registry {
    procedures: DashMap<String, Arc<dyn Procedure>>,
}

impl Registry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a procedure. A no-op if the name is already registered to
    /// an identical procedure (same contract metadata, or literally the
    /// same `Arc`); fails with [`WorkflowError::DuplicateName`] if the name
    /// is taken by a conflicting one (spec §3 invariant 5, §4.1:
    /// "idempotent on identical procedures").
    pub fn register(&self, procedure: Arc<dyn Procedure>) -> Result<()> {
        let name = procedure.metadata().name.clone();
        match self.procedures.entry(name.clone()) {
            dashmap::mapref::entry::Entry::Occupied(existing) => {
                let existing = existing.get();
                if Arc::ptr_eq(existing, &procedure) || existing.metadata() == procedure.metadata() {
                    Ok(())
                } else {
                    Err(WorkflowError::DuplicateName(name))
                }
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(procedure);
                Ok(())
            }
        }
    }

    /// Replace a procedure unconditionally, regardless of whether the name
    /// already exists. Used by the loader when applying a reload delta
    /// (spec §4.8) — registration conflicts there are a loader-level
    /// decision, not a registry-level error.
    pub fn replace(&self, procedure: Arc<dyn Procedure>) {
        let name = procedure.metadata().name.clone();
        self.procedures.insert(name, procedure);
    }

    /// Remove a procedure by name, if present.
    pub fn unregister(&self, name: &str) -> Option<Arc<dyn Procedure>> {
        self.procedures.remove(name).map(|(_, p)| p)
    }

    /// Look up a procedure by exact name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn Procedure>> {
        self.procedures.get(name).map(|entry| entry.value().clone())
    }

    /// Whether a procedure with this name is registered.
    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.procedures.contains_key(name)
    }

    /// Metadata for every registered procedure, insertion order unspecified
    /// (spec §3: "insertion-order irrelevant").
    #[must_use]
    pub fn list(&self) -> Vec<ProcedureMetadata> {
        self.procedures.iter().map(|entry| entry.value().metadata().clone()).collect()
    }

    /// Metadata for procedures visible to the workflow engine — those
    /// whose role set includes `workflow-node` (spec §4.1).
    #[must_use]
    pub fn filter_visible_to_workflow(&self) -> Vec<ProcedureMetadata> {
        self.procedures
            .iter()
            .map(|entry| entry.value().metadata().clone())
            .filter(ProcedureMetadata::visible_to_workflow)
            .collect()
    }

    /// Metadata for procedures visible to external transports — exposure
    /// `external` and role `api-endpoint` (spec §4.1).
    #[must_use]
    pub fn filter_visible_to_api(&self) -> Vec<ProcedureMetadata> {
        self.procedures
            .iter()
            .map(|entry| entry.value().metadata().clone())
            .filter(ProcedureMetadata::visible_to_api)
            .collect()
    }

    /// Number of registered procedures.
    #[must_use]
    pub fn len(&self) -> usize {
        self.procedures.len()
    }

    /// Whether no procedures are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.procedures.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::InvocationContext;
    use async_trait::async_trait;
    use serde_json::Value;

    struct Dummy(ProcedureMetadata);

    #[async_trait]
    impl Procedure for Dummy {
        fn metadata(&self) -> &ProcedureMetadata {
            &self.0
        }
        async fn invoke(&self, input: Value, _context: &InvocationContext) -> Result<Value, String> {
            Ok(input)
        }
    }

    fn dummy(name: &str) -> Arc<dyn Procedure> {
        Arc::new(Dummy(ProcedureMetadata::new(name)))
    }

    #[test]
    fn register_and_get_round_trip() {
        let registry = Registry::new();
        registry.register(dummy("echo")).unwrap();
        assert!(registry.has("echo"));
        assert_eq!(registry.get("echo").unwrap().metadata().name, "echo");
    }

    #[test]
    fn identical_reregistration_is_a_no_op() {
        let registry = Registry::new();
        registry.register(dummy("echo")).unwrap();
        registry.register(dummy("echo")).unwrap();
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn conflicting_registration_fails() {
        let registry = Registry::new();
        registry.register(dummy("echo")).unwrap();
        let mut conflicting = ProcedureMetadata::new("echo");
        conflicting.category = "different".into();
        let err = registry.register(Arc::new(Dummy(conflicting))).unwrap_err();
        assert!(matches!(err, WorkflowError::DuplicateName(name) if name == "echo"));
    }

    #[test]
    fn replace_always_succeeds() {
        let registry = Registry::new();
        registry.register(dummy("echo")).unwrap();
        registry.replace(dummy("echo"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn filter_visible_to_workflow_excludes_api_only_procedures() {
        use crate::metadata::{Exposure, ProcedureRole};

        let registry = Registry::new();
        let mut meta = ProcedureMetadata::new("api.only");
        meta.roles.clear();
        meta.roles.insert(ProcedureRole::ApiEndpoint);
        meta.exposure = Exposure::External;
        registry.register(Arc::new(Dummy(meta))).unwrap();
        registry.register(dummy("workflow.visible")).unwrap();

        let visible = registry.filter_visible_to_workflow();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].name, "workflow.visible");
    }

    #[test]
    fn unregister_removes_and_is_idempotent() {
        let registry = Registry::new();
        registry.register(dummy("temp")).unwrap();
        assert!(registry.unregister("temp").is_some());
        assert!(registry.is_empty());
        assert!(registry.unregister("temp").is_none());
    }
}
