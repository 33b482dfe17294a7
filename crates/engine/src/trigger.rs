//! Bridges event-driven workflow definitions with external delivery
//! mechanisms (spec §4.4).
//!
//! Deploying is distinct from a `trigger`/await node: the Trigger Manager
//! *starts* fresh executions from inbound events; the engine's
//! [`conduit_execution::SubscriptionRegistry`] *resumes* paused ones. The
//! same inbound event can fan out to both (spec §6.3), which is why
//! [`TriggerManager::route_event`] drives resume first, deploy second.

use std::sync::Arc;

use conduit_core::{EpochMillis, ExecutionId, SubscriptionId, WorkflowId};
use conduit_error::WorkflowError;
use conduit_registry::{Executor, InvocationContext, Registry};
use conduit_telemetry::SpanCollector;
use conduit_workflow::WorkflowDefinition;
use dashmap::DashMap;
use serde_json::Value;

use crate::engine::WorkflowEngine;
use crate::error::{EngineError, Result};
use crate::options::ExecutionOptions;

/// A deployed trigger's bookkeeping (spec §4.4: "Stores a TriggerSubscription").
#[derive(Debug, Clone)]
pub struct TriggerSubscription {
    /// The workflow this trigger is bound to.
    pub workflow_id: WorkflowId,
    /// Unique id of this deployment.
    pub subscription_id: SubscriptionId,
    /// Event source this deployment watches.
    pub provider: String,
    /// Event type this deployment starts fresh executions for.
    pub event_type: String,
    /// Expiry the trigger procedure reported, if any (e.g. a webhook
    /// channel renewal deadline).
    pub expires_at: Option<EpochMillis>,
    /// Procedure invoked on `stop`, if the trigger procedure returned one.
    pub stop_procedure_name: Option<String>,
}

/// Deploys and stops trigger-bound workflows, and routes inbound events to
/// both resuming and newly-starting executions.
///
/// Holds a reference to the engine it deploys against so `deploy` can
/// register the definition in the engine's [`crate::directory::WorkflowDirectory`]
/// and `route_event` can both resume through the engine's subscriptions and
/// start fresh executions through `execute`.
pub struct TriggerManager {
    engine: Arc<WorkflowEngine>,
    deployed: DashMap<WorkflowId, TriggerSubscription>,
}

impl TriggerManager {
    /// Build a manager over a shared engine.
    #[must_use]
    pub fn new(engine: Arc<WorkflowEngine>) -> Self {
        Self { engine, deployed: DashMap::new() }
    }

    /// Deploy `definition` as a trigger target (spec §4.4).
    ///
    /// `definition.trigger` must be set; invokes the bound trigger
    /// procedure (e.g. a `watch` that opens a webhook channel) and, on
    /// success, registers the deployment and makes the definition
    /// resolvable for `route_event`.
    pub async fn deploy(
        &self,
        definition: Arc<WorkflowDefinition>,
        registry: &Registry,
    ) -> Result<TriggerSubscription> {
        let binding = definition.trigger.clone().ok_or_else(|| {
            EngineError::from(WorkflowError::DeploymentError {
                workflow: definition.id.to_string(),
                message: "definition has no trigger binding".into(),
            })
        })?;

        let spans = SpanCollector::new();
        let invocation_ctx =
            InvocationContext::new(format!("deploy:{}", definition.id), "trigger-manager");
        let executor = Executor::new(registry, self.engine.event_bus(), &spans);
        executor
            .invoke(&binding.trigger_procedure_name, Value::Null, &invocation_ctx, None)
            .await
            .map_err(|err| {
                EngineError::from(WorkflowError::DeploymentError {
                    workflow: definition.id.to_string(),
                    message: err.to_string(),
                })
            })?;

        let subscription = TriggerSubscription {
            workflow_id: definition.id,
            subscription_id: SubscriptionId::v4(),
            provider: binding.provider,
            event_type: binding.event_type,
            expires_at: None,
            stop_procedure_name: None,
        };

        self.engine.workflows().insert(definition);
        self.deployed.insert(subscription.workflow_id, subscription.clone());
        Ok(subscription)
    }

    /// Stop a deployed workflow's trigger (spec §4.4): invokes the stop
    /// procedure if one was recorded, then drops the subscription
    /// regardless of whether a stop procedure existed.
    pub async fn stop(&self, workflow_id: WorkflowId, registry: &Registry) -> Result<()> {
        let Some((_, subscription)) = self.deployed.remove(&workflow_id) else {
            return Ok(());
        };
        if let Some(stop_procedure) = &subscription.stop_procedure_name {
            let spans = SpanCollector::new();
            let invocation_ctx =
                InvocationContext::new(format!("stop:{workflow_id}"), "trigger-manager");
            let executor = Executor::new(registry, self.engine.event_bus(), &spans);
            executor.invoke(stop_procedure, Value::Null, &invocation_ctx, None).await?;
        }
        Ok(())
    }

    /// Stop every deployed trigger (spec §4.4: "stopAll: iterates").
    pub async fn stop_all(&self, registry: &Registry) -> Result<()> {
        let ids: Vec<WorkflowId> = self.deployed.iter().map(|entry| *entry.key()).collect();
        for id in ids {
            self.stop(id, registry).await?;
        }
        Ok(())
    }

    /// Number of currently deployed triggers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.deployed.len()
    }

    /// Whether no triggers are currently deployed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.deployed.is_empty()
    }

    /// Route one inbound event (spec §6.3): resume every matching paused
    /// execution first, then start a fresh execution for every deployed
    /// trigger-bound workflow matching `(provider, event_type)`.
    ///
    /// Returns the ids of newly-started executions; resumed executions are
    /// not included since they already existed.
    pub async fn route_event(
        &self,
        provider: &str,
        event_type: &str,
        payload: Value,
        registry: Arc<Registry>,
    ) -> Result<Vec<ExecutionId>> {
        for paused in self.engine.subscriptions().find_matching(provider, event_type, &payload) {
            self.engine.subscriptions().remove(paused.execution_id);
            let Some(definition) = self.engine.workflows().get(paused.workflow_id) else {
                continue;
            };
            self.engine
                .resume(
                    definition,
                    registry.clone(),
                    paused.resume_state,
                    payload.clone(),
                    ExecutionOptions::new(),
                )
                .await?;
        }

        let mut started = Vec::new();
        let matching_deployments: Vec<WorkflowId> = self
            .deployed
            .iter()
            .filter(|entry| entry.value().provider == provider && entry.value().event_type == event_type)
            .map(|entry| *entry.key())
            .collect();

        for workflow_id in matching_deployments {
            let Some(definition) = self.engine.workflows().get(workflow_id) else {
                continue;
            };
            let trigger_input = serde_json::json!({ "trigger": { "payload": payload.clone() } });
            let result = self
                .engine
                .execute(definition, registry.clone(), trigger_input, ExecutionOptions::new())
                .await?;
            started.push(result.execution_id);
        }

        Ok(started)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use conduit_core::NodeId;
    use conduit_eventbus::EventBus;
    use conduit_execution::{ExecutionStore, SubscriptionRegistry};
    use conduit_registry::{Procedure, ProcedureMetadata};
    use conduit_workflow::{NodeKind, TriggerBinding, WorkflowNode};

    use crate::directory::WorkflowDirectory;

    struct Watch;

    #[async_trait]
    impl Procedure for Watch {
        fn metadata(&self) -> &ProcedureMetadata {
            static META: std::sync::OnceLock<ProcedureMetadata> = std::sync::OnceLock::new();
            META.get_or_init(|| ProcedureMetadata::new("drive.watch"))
        }

        async fn invoke(
            &self,
            _input: Value,
            _context: &InvocationContext,
        ) -> std::result::Result<Value, String> {
            Ok(Value::Null)
        }
    }

    fn manager() -> (Arc<TriggerManager>, Arc<Registry>) {
        let engine = Arc::new(WorkflowEngine::new(
            Arc::new(EventBus::default()),
            Arc::new(ExecutionStore::default()),
            Arc::new(SubscriptionRegistry::new()),
            Arc::new(WorkflowDirectory::new()),
        ));
        let registry = Registry::new();
        registry.register(Arc::new(Watch)).unwrap();
        (Arc::new(TriggerManager::new(engine)), Arc::new(registry))
    }

    fn triggered_definition() -> Arc<WorkflowDefinition> {
        let start = NodeId::v4();
        let definition = WorkflowDefinition::new(WorkflowId::v4(), "triggered", start, vec![
            WorkflowNode::new(start, NodeKind::Sequential),
        ])
        .with_trigger(TriggerBinding {
            provider: "drive".into(),
            trigger_procedure_name: "drive.watch".into(),
            event_type: "change".into(),
        });
        Arc::new(definition)
    }

    #[tokio::test]
    async fn deploy_requires_a_trigger_binding() {
        let (manager, registry) = manager();
        let start = NodeId::v4();
        let untriggered = Arc::new(WorkflowDefinition::new(
            WorkflowId::v4(),
            "plain",
            start,
            vec![WorkflowNode::new(start, NodeKind::Sequential)],
        ));
        let err = manager.deploy(untriggered, &registry).await.unwrap_err();
        assert!(matches!(err, EngineError::Workflow(WorkflowError::DeploymentError { .. })));
    }

    #[tokio::test]
    async fn route_event_starts_a_fresh_execution_for_a_deployed_trigger() {
        let (manager, registry) = manager();
        let definition = triggered_definition();
        manager.deploy(definition, &registry).await.unwrap();

        let started = manager
            .route_event("drive", "change", serde_json::json!({"fileId": "f1"}), registry)
            .await
            .unwrap();
        assert_eq!(started.len(), 1);
    }

    #[tokio::test]
    async fn stop_removes_the_deployment_so_future_events_start_nothing() {
        let (manager, registry) = manager();
        let definition = triggered_definition();
        let subscription = manager.deploy(definition, &registry).await.unwrap();
        manager.stop(subscription.workflow_id, &registry).await.unwrap();
        assert!(manager.is_empty());

        let started = manager
            .route_event("drive", "change", Value::Null, registry)
            .await
            .unwrap();
        assert!(started.is_empty());
    }
}
