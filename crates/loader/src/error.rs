//! Loader-specific error taxonomy (spec §4.8).
//!
//! Distinct from [`conduit_error::WorkflowError`]: these are failures of
//! *discovery* (a file won't read, won't parse, won't validate), not of
//! execution. A [`LoaderError`] never reaches a running workflow.

use std::path::PathBuf;

use conduit_error::WorkflowError;

/// Failure discovering or applying a single source (file or procedure
/// module) during a load or reload.
#[derive(Debug, thiserror::Error)]
pub enum LoaderError {
    /// The workflow root, or a subdirectory under it, could not be listed.
    #[error("failed to read directory {path}: {message}")]
    DirectoryRead {
        /// Directory that failed to list.
        path: PathBuf,
        /// Underlying OS error message.
        message: String,
    },

    /// A workflow definition file could not be read from disk.
    #[error("failed to read workflow file {path}: {message}")]
    Io {
        /// File that failed to read.
        path: PathBuf,
        /// Underlying OS error message.
        message: String,
    },

    /// A workflow definition file is not well-formed JSON, or does not
    /// match the `WorkflowDefinition` shape.
    #[error("failed to parse workflow file {path}: {message}")]
    Parse {
        /// File that failed to parse.
        path: PathBuf,
        /// Underlying deserialization error message.
        message: String,
    },

    /// A workflow definition file parsed but failed a structural invariant
    /// (spec §3 invariants 1-5).
    #[error("workflow file {path} failed validation: {source}")]
    Invalid {
        /// File whose definition failed validation.
        path: PathBuf,
        /// The invariant that was violated.
        #[source]
        source: WorkflowError,
    },

    /// `load_workflows` was called before a root directory was configured.
    #[error("no workflow root directory configured")]
    NoWorkflowRoot,
}

/// Convenience alias for loader operations.
pub type Result<T> = std::result::Result<T, LoaderError>;
