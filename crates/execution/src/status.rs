//! Execution- and node-level status (spec §3).

use serde::{Deserialize, Serialize};

/// Overall status of a workflow execution (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    /// Created but not yet dispatching nodes.
    Pending,
    /// Actively dispatching nodes.
    Running,
    /// Suspended at a `trigger`/await node, a subscription is registered.
    Paused,
    /// Reached a terminal node with no failure.
    Completed,
    /// A node failed with no `onError` route, or the workflow failed
    /// structurally.
    Failed,
    /// Cooperative cancellation completed.
    Cancelled,
}

impl ExecutionStatus {
    /// Whether this status ends the execution's observable lifetime —
    /// eligible for Execution Store eviction and Event Bus topic closure.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// Status of a single node within an execution (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    /// Dispatch has started but not finished.
    Running,
    /// The node's handler returned successfully.
    Completed,
    /// The node's handler failed.
    Failed,
    /// Bypassed by a condition branch or parallel cancellation.
    Skipped,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_completed_failed_cancelled_are_terminal() {
        assert!(ExecutionStatus::Completed.is_terminal());
        assert!(ExecutionStatus::Failed.is_terminal());
        assert!(ExecutionStatus::Cancelled.is_terminal());
        assert!(!ExecutionStatus::Pending.is_terminal());
        assert!(!ExecutionStatus::Running.is_terminal());
        assert!(!ExecutionStatus::Paused.is_terminal());
    }

    #[test]
    fn display_matches_serde_rename() {
        assert_eq!(ExecutionStatus::Cancelled.to_string(), "cancelled");
        let json = serde_json::to_string(&ExecutionStatus::Cancelled).unwrap();
        assert_eq!(json, "\"cancelled\"");
    }
}
