//! The [`Procedure`] trait (spec §3, §4.1).

use async_trait::async_trait;
use serde_json::Value;

use crate::context::InvocationContext;
use crate::metadata::ProcedureMetadata;

/// A single contract-validated, invokable unit of work.
///
/// Mirrors `nebula_action::Action` in spirit: a type-erased, object-safe
/// trait stored behind `Arc<dyn Procedure>` in the registry. Unlike the
/// teacher's action hierarchy (`ProcessAction`/`StatefulAction`/...),
/// procedures here are one shape — the workflow engine's richer node kinds
/// (parallel, condition, subworkflow) are a property of the workflow graph,
/// not of the procedure itself.
#[async_trait]
pub trait Procedure: Send + Sync {
    /// Static contract metadata.
    fn metadata(&self) -> &ProcedureMetadata;

    /// Run the procedure's handler against already-schema-validated input.
    ///
    /// Returns `Err` with a human-readable message on handler failure; the
    /// [`crate::Executor`] wraps it into
    /// [`conduit_error::WorkflowError::HandlerError`].
    async fn invoke(&self, input: Value, context: &InvocationContext) -> Result<Value, String>;
}

#[cfg(test)]
mod tests {
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

    #[tokio::test]
    async fn echo_returns_its_input() {
        let echo = Echo(ProcedureMetadata::new("echo"));
        let ctx = InvocationContext::new("req-1", "test");
        let out = echo.invoke(serde_json::json!({"a": 1}), &ctx).await.unwrap();
        assert_eq!(out, serde_json::json!({"a": 1}));
    }
}
