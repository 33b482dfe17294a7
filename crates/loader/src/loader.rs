//! Orchestrates both discovery halves and applies their deltas (spec §4.8).

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use conduit_core::WorkflowId;
use conduit_engine::WorkflowDirectory;
use conduit_registry::Registry;
use conduit_workflow::{validate, WorkflowDefinition};

use crate::discovery::discover_workflow_files;
use crate::error::LoaderError;
use crate::index::{Delta, Index};
use crate::module::ProcedureModule;

/// Discovers workflow definitions from a directory tree and procedures from
/// statically-linked modules, applying reloads to a shared registry and
/// workflow directory (spec §4.8).
///
/// Grounded on `nebula_plugin::loader::PluginLoader`'s shape (one loader,
/// one target directory, a cache of what it has already loaded) adapted to
/// two sources instead of one shared-library scan.
pub struct LibraryLoader {
    registry: Arc<Registry>,
    workflows: Arc<WorkflowDirectory>,
    workflow_root: Option<PathBuf>,
    workflow_index: Index,
    procedure_index: Index,
}

impl LibraryLoader {
    /// Build a loader over an already-constructed registry and workflow
    /// directory; both are shared with the engine that will run against
    /// them.
    #[must_use]
    pub fn new(registry: Arc<Registry>, workflows: Arc<WorkflowDirectory>) -> Self {
        Self {
            registry,
            workflows,
            workflow_root: None,
            workflow_index: Index::new(),
            procedure_index: Index::new(),
        }
    }

    /// Set the directory scanned for workflow definition files.
    #[must_use]
    pub fn with_workflow_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.workflow_root = Some(root.into());
        self
    }

    /// Register every procedure a statically-linked module provides
    /// (spec §4.8). Replaces any procedure already registered under the
    /// same name and unregisters names this module owned on a previous
    /// call but no longer does.
    pub fn load_module(&self, module: &dyn ProcedureModule) -> Delta {
        let procedures = module.procedures();
        let new_names: HashSet<String> =
            procedures.iter().map(|procedure| procedure.metadata().name.clone()).collect();

        let delta = self.procedure_index.compute_delta(module.name(), &new_names);

        for procedure in procedures {
            self.registry.replace(procedure);
        }
        for removed in &delta.removed {
            self.registry.unregister(removed);
        }

        self.procedure_index.commit(module.name().to_string(), new_names);
        delta
    }

    /// Scan the workflow root for definition files and (re)load each one,
    /// then drop any previously-loaded definition whose file has since
    /// disappeared.
    ///
    /// A single file's read, parse, or validation failure is logged and
    /// skipped; it neither stops the scan nor touches the registry
    /// (spec §4.8: "Reload failures for one file must not mutate the
    /// registry").
    pub fn load_workflows(&self) -> Result<Vec<Delta>, LoaderError> {
        let root = self.workflow_root.clone().ok_or(LoaderError::NoWorkflowRoot)?;
        let discovered = discover_workflow_files(&root)?;
        let discovered_keys: HashSet<String> =
            discovered.iter().map(|path| path.display().to_string()).collect();

        let mut deltas = Vec::new();
        for file in &discovered {
            match self.reload_workflow_file(file) {
                Ok(delta) => deltas.push(delta),
                Err(err) => {
                    tracing::warn!(path = %file.display(), error = %err, "skipping workflow file that failed to load");
                }
            }
        }

        for stale in self.workflow_index.known_sources() {
            if !discovered_keys.contains(&stale) {
                deltas.push(self.forget_workflow_file(Path::new(&stale)));
            }
        }

        Ok(deltas)
    }

    /// Load or reload a single workflow definition file.
    ///
    /// Parsing and validation both happen before anything is written to
    /// the workflow directory or the index, so a malformed file leaves
    /// prior state untouched.
    pub fn reload_workflow_file(&self, path: &Path) -> Result<Delta, LoaderError> {
        let content = std::fs::read_to_string(path)
            .map_err(|err| LoaderError::Io { path: path.to_path_buf(), message: err.to_string() })?;
        let definition: WorkflowDefinition = serde_json::from_str(&content)
            .map_err(|err| LoaderError::Parse { path: path.to_path_buf(), message: err.to_string() })?;
        validate::validate(&definition, &self.registry)
            .map_err(|source| LoaderError::Invalid { path: path.to_path_buf(), source })?;

        let key = path.display().to_string();
        let mut new_names = HashSet::new();
        new_names.insert(definition.id.to_string());
        let delta = self.workflow_index.compute_delta(&key, &new_names);

        self.workflows.insert(Arc::new(definition));
        self.workflow_index.commit(key, new_names);
        Ok(delta)
    }

    /// Drop the definition a now-missing file previously owned.
    fn forget_workflow_file(&self, path: &Path) -> Delta {
        let key = path.display().to_string();
        let owned = self.workflow_index.forget(&key);
        for id in &owned {
            if let Ok(workflow_id) = id.parse::<WorkflowId>() {
                self.workflows.remove(workflow_id);
            }
        }
        Delta { added: Vec::new(), updated: Vec::new(), removed: owned.into_iter().collect() }
    }

    /// Number of workflow definition files currently tracked.
    #[must_use]
    pub fn loaded_workflow_file_count(&self) -> usize {
        self.workflow_index.len()
    }

    /// Number of procedure modules currently tracked.
    #[must_use]
    pub fn loaded_module_count(&self) -> usize {
        self.procedure_index.len()
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use conduit_core::NodeId;
    use conduit_registry::{InvocationContext, Procedure, ProcedureMetadata};
    use conduit_workflow::{NodeKind, WorkflowNode};
    use serde_json::Value;

    use super::*;

    struct Echo(ProcedureMetadata);

    #[async_trait]
    impl Procedure for Echo {
        fn metadata(&self) -> &ProcedureMetadata {
            &self.0
        }

        async fn invoke(&self, input: Value, _context: &InvocationContext) -> Result<Value, String> {
            Ok(input)
        }
    }

    struct EchoModule(Vec<&'static str>);

    impl ProcedureModule for EchoModule {
        fn name(&self) -> &str {
            "echo-module"
        }

        fn procedures(&self) -> Vec<Arc<dyn Procedure>> {
            self.0.iter().map(|name| Arc::new(Echo(ProcedureMetadata::new(*name))) as Arc<dyn Procedure>).collect()
        }
    }

    fn loader() -> LibraryLoader {
        LibraryLoader::new(Arc::new(Registry::new()), Arc::new(WorkflowDirectory::new()))
    }

    fn write_definition(dir: &Path, file_name: &str, id: WorkflowId) {
        let start = NodeId::v4();
        let definition = WorkflowDefinition::new(id, "wf", start, vec![WorkflowNode::new(start, NodeKind::Sequential)]);
        std::fs::write(dir.join(file_name), serde_json::to_string(&definition).unwrap()).unwrap();
    }

    #[test]
    fn load_module_registers_its_procedures() {
        let loader = loader();
        let delta = loader.load_module(&EchoModule(vec!["echo.a", "echo.b"]));
        assert_eq!(delta.added.len(), 2);
        assert!(loader.registry.has("echo.a"));
        assert!(loader.registry.has("echo.b"));
    }

    #[test]
    fn reloading_a_module_with_a_dropped_name_unregisters_it() {
        let loader = loader();
        loader.load_module(&EchoModule(vec!["echo.a", "echo.b"]));
        let delta = loader.load_module(&EchoModule(vec!["echo.a"]));
        assert_eq!(delta.removed, vec!["echo.b".to_string()]);
        assert!(!loader.registry.has("echo.b"));
        assert!(loader.registry.has("echo.a"));
    }

    #[test]
    fn load_workflows_discovers_and_registers_definitions() {
        let root = tempfile::tempdir().unwrap();
        let id = WorkflowId::v4();
        write_definition(root.path(), "wf.json", id);

        let loader = loader().with_workflow_root(root.path());
        let deltas = loader.load_workflows().unwrap();
        assert_eq!(deltas.len(), 1);
        assert!(loader.workflows.get(id).is_some());
    }

    #[test]
    fn a_malformed_file_is_skipped_without_touching_the_directory() {
        let root = tempfile::tempdir().unwrap();
        let id = WorkflowId::v4();
        write_definition(root.path(), "good.json", id);
        std::fs::write(root.path().join("bad.json"), "not json").unwrap();

        let loader = loader().with_workflow_root(root.path());
        let deltas = loader.load_workflows().unwrap();
        assert_eq!(deltas.len(), 1);
        assert!(loader.workflows.get(id).is_some());
        assert_eq!(loader.loaded_workflow_file_count(), 1);
    }

    #[test]
    fn deleting_a_file_removes_its_workflow_on_the_next_scan() {
        let root = tempfile::tempdir().unwrap();
        let id = WorkflowId::v4();
        write_definition(root.path(), "wf.json", id);

        let loader = loader().with_workflow_root(root.path());
        loader.load_workflows().unwrap();
        assert!(loader.workflows.get(id).is_some());

        std::fs::remove_file(root.path().join("wf.json")).unwrap();
        let deltas = loader.load_workflows().unwrap();
        assert!(deltas.iter().any(|delta| delta.removed.contains(&id.to_string())));
        assert!(loader.workflows.get(id).is_none());
    }

    #[test]
    fn load_workflows_without_a_root_fails() {
        let loader = loader();
        assert!(matches!(loader.load_workflows(), Err(LoaderError::NoWorkflowRoot)));
    }
}
