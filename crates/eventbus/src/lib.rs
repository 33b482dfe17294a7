//! # Conduit Event Bus
//!
//! Topic-based, best-effort fan-out for procedure, node, and workflow
//! lifecycle events (spec §4.6). Backs the live monitoring / SSE-style
//! surface described in spec §6.6 — transports adapt [`EventSubscription`]
//! to their native streaming format; this crate has no opinion on HTTP.

mod bus;
mod event;

pub use bus::{EventBus, EventBusConfig, EventSubscription};
pub use event::Event;
