//! # Conduit Registry
//!
//! Procedure contracts, the concurrent registry they live in, and the
//! one-shot invocation pipeline (spec §3, §4.1, §4.2). The workflow engine
//! (`conduit-engine`) is this crate's main consumer: `procedure` nodes
//! resolve against a [`Registry`] and dispatch through an [`Executor`].

mod context;
mod executor;
mod metadata;
mod procedure;
mod registry;
mod schema;

pub use context::InvocationContext;
pub use executor::Executor;
pub use metadata::{
    Exposure, ProcedureKind, ProcedureMetadata, ProcedureRole, TriggerDescriptor, TriggerTransport,
};
pub use procedure::Procedure;
pub use registry::Registry;
