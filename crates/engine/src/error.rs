//! Engine-level error type.
//!
//! Grounded on the teacher's `nebula_engine::error::EngineError`: a thin
//! wrapper that forwards the lower layers' error taxonomy and adds only
//! what is specific to running the dispatch loop itself.

use conduit_error::WorkflowError;

/// Everything that can go wrong while executing or resuming a workflow.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// An error from the shared taxonomy (spec §7) — validation, missing
    /// procedure/node, cancellation, timeout, and so on.
    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    /// A spawned parallel-branch task panicked instead of returning.
    #[error("node task panicked: {0}")]
    TaskPanicked(String),
}

impl EngineError {
    /// Borrow the underlying [`WorkflowError`], if this is that variant.
    #[must_use]
    pub fn as_workflow(&self) -> Option<&WorkflowError> {
        match self {
            Self::Workflow(err) => Some(err),
            Self::TaskPanicked(_) => None,
        }
    }

    /// The stable kind name used in `ExecutionResult::error::name` (spec
    /// §6.7).
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Workflow(err) => err.kind_name(),
            Self::TaskPanicked(_) => "TaskPanicked",
        }
    }
}

/// Convenience alias used throughout the engine crate.
pub type Result<T> = std::result::Result<T, EngineError>;
