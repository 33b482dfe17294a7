//! Statically-linked procedure discovery (spec §4.8).
//!
//! A directory scan can't discover Rust code the way it discovers JSON: a
//! procedure-providing crate implements this trait once and hands its
//! instance to [`crate::LibraryLoader::load_module`] at startup. This is
//! the "explicit contract type" spec §9 asks for, applied at the module
//! boundary rather than per-discovered-file.

use std::sync::Arc;

use conduit_registry::Procedure;

/// A statically-linked provider of procedures, registered once at startup.
pub trait ProcedureModule: Send + Sync {
    /// Stable name identifying this module as an ownership source in the
    /// loader's index (spec §4.8) — not a procedure name itself.
    fn name(&self) -> &str;

    /// Every procedure this module provides.
    fn procedures(&self) -> Vec<Arc<dyn Procedure>>;
}
