//! Static procedure metadata (spec §3, §4.1).

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Who is allowed to see or invoke a procedure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProcedureRole {
    /// Invokable as a `procedure` workflow node.
    WorkflowNode,
    /// Invokable directly by external transports (HTTP, etc.).
    ApiEndpoint,
    /// Invokable by a generated SDK client.
    SdkClient,
    /// Acts as an event source for trigger-bound workflows.
    Trigger,
}

/// Whether a procedure is reachable from outside the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Exposure {
    /// Reachable only from within the engine / other procedures.
    Internal,
    /// Reachable from external transports, subject to `ApiEndpoint` role.
    External,
}

/// Coarse-grained procedure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcedureKind {
    /// An ordinary callable action.
    Action,
    /// An event source; carries a [`TriggerDescriptor`].
    Trigger,
}

/// How inbound events reach a trigger procedure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerTransport {
    /// HTTP webhook delivery.
    Webhook,
    /// Polling an external resource for changes.
    Watch,
    /// Interval-based polling.
    Poll,
    /// A continuous push stream.
    Stream,
    /// A pub/sub subscription.
    Subscription,
}

/// Static description of a trigger procedure's event source (spec §3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerDescriptor {
    /// Delivery mechanism.
    pub transport: TriggerTransport,
    /// Event types this trigger can emit.
    pub event_types: HashSet<String>,
    /// Name of the procedure that stops this trigger's deployment, if any.
    pub stop_procedure: Option<String>,
    /// Polling interval in milliseconds, for `Poll`-transport triggers.
    pub polling_interval_ms: Option<u64>,
    /// Whether this trigger supports event filtering at deploy time.
    pub supports_filtering: bool,
}

/// Static metadata describing a procedure (spec §3, §4.1).
///
/// Mirrors the shape of `ActionMetadata` in spirit: built incrementally via
/// `with_*` setters, then handed to the registry alongside a handler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcedureMetadata {
    /// Unique procedure name.
    pub name: String,
    /// UI/documentation category.
    pub category: String,
    /// Free-form tags for discovery/filtering.
    pub tags: Vec<String>,
    /// Who may see or call this procedure.
    pub roles: HashSet<ProcedureRole>,
    /// Internal vs. external reachability.
    pub exposure: Exposure,
    /// Action vs. trigger.
    pub kind: ProcedureKind,
    /// Present iff `kind == Trigger`.
    pub trigger: Option<TriggerDescriptor>,
    /// JSON Schema subset for input validation (spec §4.2, §6.5 grammar n/a).
    pub input_schema: Option<serde_json::Value>,
    /// JSON Schema subset for output validation.
    pub output_schema: Option<serde_json::Value>,
}

impl ProcedureMetadata {
    /// Minimal metadata: an internal, workflow-node-visible action with no
    /// schema validation.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let mut roles = HashSet::new();
        roles.insert(ProcedureRole::WorkflowNode);
        Self {
            name: name.into(),
            category: String::new(),
            tags: Vec::new(),
            roles,
            exposure: Exposure::Internal,
            kind: ProcedureKind::Action,
            trigger: None,
            input_schema: None,
            output_schema: None,
        }
    }

    /// Set the UI category.
    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// Add a discovery tag.
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Add a visibility role.
    #[must_use]
    pub fn with_role(mut self, role: ProcedureRole) -> Self {
        self.roles.insert(role);
        self
    }

    /// Mark externally reachable.
    #[must_use]
    pub fn with_exposure(mut self, exposure: Exposure) -> Self {
        self.exposure = exposure;
        self
    }

    /// Attach a trigger descriptor and mark `kind = Trigger`, implying the
    /// `Trigger` and `WorkflowNode` roles per spec §4.1.
    #[must_use]
    pub fn with_trigger(mut self, descriptor: TriggerDescriptor) -> Self {
        self.kind = ProcedureKind::Trigger;
        self.roles.insert(ProcedureRole::Trigger);
        self.roles.insert(ProcedureRole::WorkflowNode);
        self.trigger = Some(descriptor);
        self
    }

    /// Set the JSON Schema subset used to validate input.
    #[must_use]
    pub fn with_input_schema(mut self, schema: serde_json::Value) -> Self {
        self.input_schema = Some(schema);
        self
    }

    /// Set the JSON Schema subset used to validate output.
    #[must_use]
    pub fn with_output_schema(mut self, schema: serde_json::Value) -> Self {
        self.output_schema = Some(schema);
        self
    }

    /// Visible to the workflow engine as a `procedure` node target.
    #[must_use]
    pub fn visible_to_workflow(&self) -> bool {
        self.roles.contains(&ProcedureRole::WorkflowNode)
    }

    /// Visible to external transports (HTTP, etc.).
    #[must_use]
    pub fn visible_to_api(&self) -> bool {
        self.exposure == Exposure::External && self.roles.contains(&ProcedureRole::ApiEndpoint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_metadata_defaults_to_internal_workflow_node() {
        let meta = ProcedureMetadata::new("http.get");
        assert!(meta.visible_to_workflow());
        assert!(!meta.visible_to_api());
        assert_eq!(meta.kind, ProcedureKind::Action);
    }

    #[test]
    fn api_visibility_requires_both_exposure_and_role() {
        let meta = ProcedureMetadata::new("http.get")
            .with_exposure(Exposure::External)
            .with_role(ProcedureRole::ApiEndpoint);
        assert!(meta.visible_to_api());

        let half = ProcedureMetadata::new("http.get").with_exposure(Exposure::External);
        assert!(!half.visible_to_api());
    }

    #[test]
    fn trigger_descriptor_implies_roles() {
        let meta = ProcedureMetadata::new("webhook.order_created").with_trigger(TriggerDescriptor {
            transport: TriggerTransport::Webhook,
            event_types: HashSet::from(["order.created".to_string()]),
            stop_procedure: None,
            polling_interval_ms: None,
            supports_filtering: true,
        });
        assert!(meta.roles.contains(&ProcedureRole::Trigger));
        assert!(meta.roles.contains(&ProcedureRole::WorkflowNode));
        assert_eq!(meta.kind, ProcedureKind::Trigger);
    }
}
