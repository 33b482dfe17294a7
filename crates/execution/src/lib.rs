//! # Conduit Execution
//!
//! Execution history (spec §4.5) and the subscription bookkeeping that
//! backs pause/resume (spec §3, §4.3, §4.4). The workflow engine
//! (`conduit-engine`) owns one [`ExecutionStore`] and one
//! [`SubscriptionRegistry`] for its whole lifetime; both are safe to share
//! across concurrently running executions.

mod record;
mod resume;
mod status;
mod store;

pub use record::{ExecutionRecord, NodeDetail};
pub use resume::{PausedExecution, ResumeCriteria, ResumeState, SubscriptionRegistry};
pub use status::{ExecutionStatus, NodeStatus};
pub use store::{ExecutionStats, ExecutionStore, StoreConfig};
