//! One-shot, contract-validated procedure invocation (spec §4.2).

use conduit_error::{Result, WorkflowError};
use conduit_eventbus::{Event, EventBus};
use conduit_telemetry::{Attributes, SpanCollector, SpanStatus};
use serde_json::Value;

use crate::context::InvocationContext;
use crate::registry::Registry;
use crate::schema;

/// Looks a procedure up in a [`Registry`] and runs it through the
/// validate → invoke → validate pipeline, publishing lifecycle events and
/// a span along the way.
///
/// Grounded on the teacher's sandbox/runtime split
/// (`nebula_sandbox_inprocess::InProcessSandbox::execute`): entry/exit
/// logging plus a delegate call, minus the capability-sandbox boundary,
/// which this crate has no use for — procedure handlers already run
/// in-process as plain trait objects.
pub struct Executor<'a> {
    registry: &'a Registry,
    event_bus: &'a EventBus,
    spans: &'a SpanCollector,
}

impl<'a> Executor<'a> {
    /// Build an executor bound to a registry, an event bus, and the span
    /// collector of the trace this invocation belongs to.
    #[must_use]
    pub fn new(registry: &'a Registry, event_bus: &'a EventBus, spans: &'a SpanCollector) -> Self {
        Self { registry, event_bus, spans }
    }

    /// Run `procedure_name` against `input`, returning the validated
    /// output or the first applicable failure mode (spec §4.2).
    ///
    /// `parent_span` roots the procedure's span — `None` for a standalone
    /// call, `Some(node_span)` when invoked from a `procedure` workflow
    /// node.
    pub async fn invoke(
        &self,
        procedure_name: &str,
        input: Value,
        context: &InvocationContext,
        parent_span: Option<conduit_core::SpanId>,
    ) -> Result<Value> {
        let procedure = self
            .registry
            .get(procedure_name)
            .ok_or_else(|| WorkflowError::ProcedureNotFound(procedure_name.to_string()))?;

        let parent_span = parent_span.or(context.parent_span_id);
        let mut span_attrs = Attributes::new();
        span_attrs.insert("procedure.name".into(), procedure_name.into());
        span_attrs.insert("request.id".into(), context.request_id.clone().into());
        let span_id = self.spans.start_span(procedure_name.to_string(), span_attrs, parent_span);

        self.event_bus.publish(Event::ProcedureStarted {
            request_id: context.request_id.clone(),
            procedure: procedure_name.to_string(),
        });
        tracing::debug!(procedure = procedure_name, request_id = %context.request_id, "procedure invocation started");

        let result = self.run(&procedure, input, context).await;

        match &result {
            Ok(output) => {
                self.spans.end_span(span_id, SpanStatus::ok());
                self.event_bus.publish(Event::ProcedureCompleted {
                    request_id: context.request_id.clone(),
                    procedure: procedure_name.to_string(),
                    output: output.clone(),
                });
            }
            Err(error) => {
                self.spans.record_exception(span_id, error.to_string());
                self.event_bus.publish(Event::ProcedureFailed {
                    request_id: context.request_id.clone(),
                    procedure: procedure_name.to_string(),
                    error: error.to_string(),
                });
            }
        }

        result
    }

    async fn run(
        &self,
        procedure: &std::sync::Arc<dyn crate::Procedure>,
        input: Value,
        context: &InvocationContext,
    ) -> Result<Value> {
        let metadata = procedure.metadata();

        if let Some(input_schema) = &metadata.input_schema {
            let issues = schema::validate(input_schema, &input);
            if !issues.is_empty() {
                return Err(WorkflowError::InputValidation {
                    procedure: metadata.name.clone(),
                    issues,
                });
            }
        }

        let output = procedure
            .invoke(input, context)
            .await
            .map_err(|message| WorkflowError::handler_error(None, message))?;

        if let Some(output_schema) = &metadata.output_schema {
            let issues = schema::validate(output_schema, &output);
            if !issues.is_empty() {
                return Err(WorkflowError::OutputValidation {
                    procedure: metadata.name.clone(),
                    issues,
                });
            }
        }

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::ProcedureMetadata;
    use crate::procedure::Procedure;
    use async_trait::async_trait;
    use conduit_eventbus::EventBus;
    use conduit_telemetry::SpanCollector;
    use serde_json::json;
    use std::sync::Arc;

    struct Double;

    #[async_trait]
    impl Procedure for Double {
        fn metadata(&self) -> &ProcedureMetadata {
            static META: std::sync::OnceLock<ProcedureMetadata> = std::sync::OnceLock::new();
            META.get_or_init(|| {
                ProcedureMetadata::new("math.double")
                    .with_input_schema(json!({
                        "type": "object",
                        "required": ["n"],
                        "properties": { "n": { "type": "number" } }
                    }))
            })
        }

        async fn invoke(&self, input: Value, _context: &InvocationContext) -> Result<Value, String> {
            let n = input["n"].as_f64().ok_or("n must be a number")?;
            Ok(json!({ "result": n * 2.0 }))
        }
    }

    struct AlwaysFails;

    #[async_trait]
    impl Procedure for AlwaysFails {
        fn metadata(&self) -> &ProcedureMetadata {
            static META: std::sync::OnceLock<ProcedureMetadata> = std::sync::OnceLock::new();
            META.get_or_init(|| ProcedureMetadata::new("always.fails"))
        }

        async fn invoke(&self, _input: Value, _context: &InvocationContext) -> Result<Value, String> {
            Err("boom".to_string())
        }
    }

    #[tokio::test]
    async fn successful_invocation_returns_output() {
        let registry = Registry::new();
        registry.register(Arc::new(Double)).unwrap();
        let bus = EventBus::default();
        let spans = SpanCollector::new();
        let executor = Executor::new(&registry, &bus, &spans);
        let ctx = InvocationContext::new("req-1", "test");

        let output = executor.invoke("math.double", json!({"n": 21}), &ctx, None).await.unwrap();
        assert_eq!(output, json!({"result": 42.0}));
    }

    #[tokio::test]
    async fn input_validation_rejects_before_invoking_handler() {
        let registry = Registry::new();
        registry.register(Arc::new(Double)).unwrap();
        let bus = EventBus::default();
        let spans = SpanCollector::new();
        let executor = Executor::new(&registry, &bus, &spans);
        let ctx = InvocationContext::new("req-1", "test");

        let err = executor.invoke("math.double", json!({}), &ctx, None).await.unwrap_err();
        assert!(matches!(err, WorkflowError::InputValidation { .. }));
    }

    #[tokio::test]
    async fn unknown_procedure_is_reported() {
        let registry = Registry::new();
        let bus = EventBus::default();
        let spans = SpanCollector::new();
        let executor = Executor::new(&registry, &bus, &spans);
        let ctx = InvocationContext::new("req-1", "test");

        let err = executor.invoke("nope", json!(null), &ctx, None).await.unwrap_err();
        assert!(matches!(err, WorkflowError::ProcedureNotFound(name) if name == "nope"));
    }

    #[tokio::test]
    async fn handler_error_is_wrapped() {
        let registry = Registry::new();
        registry.register(Arc::new(AlwaysFails)).unwrap();
        let bus = EventBus::default();
        let spans = SpanCollector::new();
        let executor = Executor::new(&registry, &bus, &spans);
        let ctx = InvocationContext::new("req-1", "test");

        let err = executor.invoke("always.fails", json!(null), &ctx, None).await.unwrap_err();
        assert!(matches!(err, WorkflowError::HandlerError { message, .. } if message == "boom"));
    }

    #[tokio::test]
    async fn span_tree_records_one_span_per_invocation() {
        let registry = Registry::new();
        registry.register(Arc::new(Double)).unwrap();
        let bus = EventBus::default();
        let spans = SpanCollector::new();
        let executor = Executor::new(&registry, &bus, &spans);
        let ctx = InvocationContext::new("req-1", "test");

        executor.invoke("math.double", json!({"n": 1}), &ctx, None).await.unwrap();
        let snapshot = spans.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].name, "math.double");
        assert!(snapshot[0].is_ended());
    }
}
