//! # Conduit Loader
//!
//! The Library Loader (spec §4.8): discovers workflow definitions and
//! procedures and applies them to a shared [`conduit_registry::Registry`]
//! and [`conduit_engine::WorkflowDirectory`].
//!
//! Rust can't duck-type "a value exporting `contract` and `handler`" out of
//! an arbitrary directory the way a dynamic host language can, so discovery
//! splits along a line the original design didn't need to draw: workflow
//! definitions are genuine data and are discovered by walking a directory
//! tree for JSON files; procedures are statically-linked Rust code and are
//! "discovered" by each providing crate implementing [`ProcedureModule`]
//! and registering itself at startup. Both halves share one incremental
//! reload mechanism, [`Index`], so a re-scan's added/updated/removed names
//! are computed identically regardless of which half produced them.

mod discovery;
mod error;
mod index;
mod loader;
mod module;

pub use discovery::discover_workflow_files;
pub use error::{LoaderError, Result};
pub use index::{Delta, Index};
pub use loader::LibraryLoader;
pub use module::ProcedureModule;
