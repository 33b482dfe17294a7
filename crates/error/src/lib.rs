//! # Conduit Error
//!
//! The cross-cutting error taxonomy from spec §7. Every fallible operation
//! in the engine, registry, and executor ultimately produces a
//! [`WorkflowError`] (or a narrower, component-specific error that converts
//! into one at the boundary where the engine needs to decide routing).
//!
//! The taxonomy distinguishes errors by how the engine *reacts* to them, not
//! by where they originate — see [`WorkflowError::recoverable_to_on_error`]
//! and [`WorkflowError::is_terminal`].

use conduit_core::NodeId;

/// A single input- or output-validation failure, with enough detail for a
/// caller to locate the offending field.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ValidationIssue {
    /// JSON-pointer-like path to the offending value (e.g. `"/amount"`).
    pub path: String,
    /// Human-readable reason the value was rejected.
    pub reason: String,
}

impl ValidationIssue {
    /// Build a new validation issue.
    pub fn new(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// The error taxonomy from spec §7.
#[derive(Debug, Clone, thiserror::Error)]
#[non_exhaustive]
pub enum WorkflowError {
    /// Input did not satisfy the procedure's input schema.
    #[error("input validation failed: {issues:?}")]
    InputValidation {
        /// The procedure whose input failed validation.
        procedure: String,
        /// Every violation found, not just the first.
        issues: Vec<ValidationIssue>,
    },

    /// Handler output did not satisfy the procedure's output schema.
    #[error("output validation failed: {issues:?}")]
    OutputValidation {
        /// The procedure whose output failed validation.
        procedure: String,
        /// Every violation found, not just the first.
        issues: Vec<ValidationIssue>,
    },

    /// A workflow node referenced a procedure name absent from the registry.
    #[error("procedure not found: {0}")]
    ProcedureNotFound(String),

    /// A successor, branch, or handler id did not resolve to a node in the
    /// workflow graph.
    #[error("node not found: {0}")]
    NodeNotFound(String),

    /// The procedure handler raised an exception.
    #[error("handler error in node {node:?}: {message}")]
    HandlerError {
        /// The node whose handler failed, if known at the point of failure.
        node: Option<NodeId>,
        /// Human-readable message surfaced by the handler.
        message: String,
    },

    /// Cooperative cancellation reached a dispatch boundary.
    #[error("execution cancelled")]
    Cancelled,

    /// An await-node or workflow-wide timeout elapsed.
    #[error("timeout waiting for {awaited}")]
    Timeout {
        /// What the engine was waiting for (an event type or "workflow").
        awaited: String,
    },

    /// A resume payload was rejected by the await node's filter predicate.
    /// Non-fatal: the paused entry stays registered (spec §4.3).
    #[error("resume rejected by filter predicate")]
    ResumeRejected,

    /// Registry conflict: a procedure name was already taken.
    #[error("duplicate procedure name: {0}")]
    DuplicateName(String),

    /// A trigger procedure invocation failed during `deploy`; no
    /// subscription was registered.
    #[error("trigger deployment failed for workflow {workflow}: {message}")]
    DeploymentError {
        /// The workflow whose trigger could not be deployed.
        workflow: String,
        /// Underlying failure message.
        message: String,
    },
}

impl WorkflowError {
    /// Build a single-issue [`WorkflowError::InputValidation`].
    pub fn input_validation(
        procedure: impl Into<String>,
        path: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InputValidation {
            procedure: procedure.into(),
            issues: vec![ValidationIssue::new(path, reason)],
        }
    }

    /// Build a single-issue [`WorkflowError::OutputValidation`].
    pub fn output_validation(
        procedure: impl Into<String>,
        path: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::OutputValidation {
            procedure: procedure.into(),
            issues: vec![ValidationIssue::new(path, reason)],
        }
    }

    /// Build a [`WorkflowError::HandlerError`] for a known node.
    pub fn handler_error(node: NodeId, message: impl Into<String>) -> Self {
        Self::HandlerError {
            node: Some(node),
            message: message.into(),
        }
    }

    /// Whether a node failure of this kind should first be offered to the
    /// node's `onError` successor before propagating to the workflow result
    /// (spec §7 propagation policy).
    #[must_use]
    pub fn recoverable_to_on_error(&self) -> bool {
        matches!(
            self,
            Self::InputValidation { .. } | Self::OutputValidation { .. } | Self::HandlerError { .. }
        )
    }

    /// Whether this error is structural (never recovered within the engine;
    /// always surfaced as a workflow failure).
    #[must_use]
    pub fn is_structural(&self) -> bool {
        matches!(self, Self::ProcedureNotFound(_) | Self::NodeNotFound(_))
    }

    /// Whether this error represents a terminal state rather than a
    /// recoverable node failure.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Timeout { .. })
    }

    /// The name of the error kind, stable across message wording changes —
    /// suitable for the `error.name` field of spec §6.7's result
    /// serialization.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::InputValidation { .. } => "InputValidation",
            Self::OutputValidation { .. } => "OutputValidation",
            Self::ProcedureNotFound(_) => "ProcedureNotFound",
            Self::NodeNotFound(_) => "NodeNotFound",
            Self::HandlerError { .. } => "HandlerError",
            Self::Cancelled => "Cancelled",
            Self::Timeout { .. } => "Timeout",
            Self::ResumeRejected => "ResumeRejected",
            Self::DuplicateName(_) => "DuplicateName",
            Self::DeploymentError { .. } => "DeploymentError",
        }
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, WorkflowError>;
