//! Bounded FIFO execution history (spec §4.5).

use std::collections::VecDeque;

use conduit_core::{ExecutionId, WorkflowId};
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::record::{ExecutionRecord, NodeDetail};
use crate::status::ExecutionStatus;

/// Tunable knobs for the store — the ambient-config counterpart of spec
/// §4.5, the way [`crate::resume::ResumeCriteria`]'s sibling
/// `conduit_eventbus::EventBusConfig` configures the event bus.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Maximum number of records retained before eviction kicks in.
    pub capacity: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { capacity: 100 }
    }
}

/// Aggregate counts across every record currently retained (spec §4.5).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionStats {
    /// Every retained record.
    pub total: usize,
    /// Records with status `completed`.
    pub completed: usize,
    /// Records with status `failed`.
    pub failed: usize,
    /// Records with status `running`.
    pub running: usize,
    /// Records with status `paused`.
    pub paused: usize,
}

/// In-memory execution history, retaining at most `capacity` records.
///
/// Grounded on the teacher's journal/status split
/// (`nebula_execution::journal`, `nebula_execution::status`), simplified to
/// the flat per-node detail shape spec §3 describes and bounded per spec
/// §4.5 rather than the teacher's unbounded append-only journal.
pub struct ExecutionStore {
    capacity: usize,
    records: DashMap<ExecutionId, ExecutionRecord>,
    /// Insertion order, oldest first — used to find eviction candidates.
    order: Mutex<VecDeque<ExecutionId>>,
}

impl ExecutionStore {
    /// Create a store retaining at most `capacity` records.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self::with_config(StoreConfig { capacity })
    }

    /// Create a store from a [`StoreConfig`].
    #[must_use]
    pub fn with_config(config: StoreConfig) -> Self {
        Self { capacity: config.capacity, records: DashMap::new(), order: Mutex::new(VecDeque::new()) }
    }

    /// Begin tracking a new execution.
    pub fn start(&self, execution_id: ExecutionId, workflow_id: WorkflowId) {
        self.records.insert(execution_id, ExecutionRecord::new(execution_id, workflow_id));
        self.order.lock().push_back(execution_id);
        self.evict_if_needed();
    }

    /// Record a node's latest detail against an execution (spec §4.5:
    /// idempotent per `(executionId, nodeId, status)`).
    pub fn update_node(&self, execution_id: ExecutionId, detail: NodeDetail) {
        if let Some(mut record) = self.records.get_mut(&execution_id) {
            record.update_node(detail);
        } else {
            tracing::warn!(?execution_id, "update_node for unknown execution");
        }
    }

    /// Transition an execution's status, terminal or otherwise.
    pub fn set_status(&self, execution_id: ExecutionId, status: ExecutionStatus) {
        if let Some(mut record) = self.records.get_mut(&execution_id) {
            record.status = status;
        }
    }

    /// Transition to a terminal status and stamp the end time.
    pub fn complete(&self, execution_id: ExecutionId, status: ExecutionStatus, error: Option<String>) {
        if let Some(mut record) = self.records.get_mut(&execution_id) {
            record.complete(status, error);
        }
        self.evict_if_needed();
    }

    /// Fetch a single record by id.
    #[must_use]
    pub fn get(&self, execution_id: ExecutionId) -> Option<ExecutionRecord> {
        self.records.get(&execution_id).map(|entry| entry.value().clone())
    }

    /// Every retained record, most recently started first.
    #[must_use]
    pub fn list(&self) -> Vec<ExecutionRecord> {
        let mut records: Vec<ExecutionRecord> =
            self.records.iter().map(|entry| entry.value().clone()).collect();
        records.sort_by(|a, b| b.start_ms.cmp(&a.start_ms));
        records
    }

    /// Retained records for one workflow, most recently started first.
    #[must_use]
    pub fn list_for_workflow(&self, workflow_id: WorkflowId) -> Vec<ExecutionRecord> {
        self.list().into_iter().filter(|r| r.workflow_id == workflow_id).collect()
    }

    /// Aggregate counts across all retained records.
    #[must_use]
    pub fn stats(&self) -> ExecutionStats {
        let mut stats = ExecutionStats::default();
        for entry in &self.records {
            stats.total += 1;
            match entry.value().status {
                ExecutionStatus::Completed => stats.completed += 1,
                ExecutionStatus::Failed => stats.failed += 1,
                ExecutionStatus::Running => stats.running += 1,
                ExecutionStatus::Paused => stats.paused += 1,
                ExecutionStatus::Pending | ExecutionStatus::Cancelled => {}
            }
        }
        stats
    }

    /// Drop every retained record.
    pub fn clear(&self) {
        self.records.clear();
        self.order.lock().clear();
    }

    /// If over capacity, evict the oldest record that has reached a
    /// terminal status. Running/paused records are never evicted (spec
    /// §4.5) — the store may temporarily exceed `capacity` if every
    /// retained record is still active.
    fn evict_if_needed(&self) {
        if self.records.len() <= self.capacity {
            return;
        }
        let mut order = self.order.lock();
        while self.records.len() > self.capacity {
            let Some(position) = order
                .iter()
                .position(|id| self.records.get(id).is_some_and(|r| r.is_terminal()))
            else {
                // Every tracked record is still active; nothing left to evict.
                break;
            };
            let candidate = order.remove(position).expect("position came from this deque");
            self.records.remove(&candidate);
        }
    }
}

impl Default for ExecutionStore {
    fn default() -> Self {
        Self::new(100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_config_honors_the_configured_capacity() {
        let store = ExecutionStore::with_config(StoreConfig { capacity: 1 });
        let wf = WorkflowId::v4();
        let a = ExecutionId::v4();
        store.start(a, wf);
        store.complete(a, ExecutionStatus::Completed, None);
        store.start(ExecutionId::v4(), wf);
        assert_eq!(store.stats().total, 1);
    }

    #[test]
    fn start_and_get_round_trip() {
        let store = ExecutionStore::default();
        let execution_id = ExecutionId::v4();
        store.start(execution_id, WorkflowId::v4());
        assert_eq!(store.get(execution_id).unwrap().status, ExecutionStatus::Pending);
    }

    #[test]
    fn overflow_evicts_oldest_terminal_record() {
        let store = ExecutionStore::new(2);
        let a = ExecutionId::v4();
        let b = ExecutionId::v4();
        let c = ExecutionId::v4();
        let wf = WorkflowId::v4();

        store.start(a, wf);
        store.complete(a, ExecutionStatus::Completed, None);
        store.start(b, wf);
        store.complete(b, ExecutionStatus::Completed, None);
        store.start(c, wf);

        assert_eq!(store.stats().total, 2);
        assert!(store.get(a).is_none());
        assert!(store.get(b).is_some());
        assert!(store.get(c).is_some());
    }

    #[test]
    fn running_records_are_never_evicted() {
        let store = ExecutionStore::new(1);
        let a = ExecutionId::v4();
        let b = ExecutionId::v4();
        let wf = WorkflowId::v4();

        store.start(a, wf);
        store.set_status(a, ExecutionStatus::Running);
        store.start(b, wf);

        // Both still present: `a` is active and cannot be evicted.
        assert!(store.get(a).is_some());
        assert!(store.get(b).is_some());
        assert_eq!(store.stats().total, 2);
    }

    #[test]
    fn stats_count_by_status() {
        let store = ExecutionStore::default();
        let wf = WorkflowId::v4();
        let a = ExecutionId::v4();
        let b = ExecutionId::v4();
        store.start(a, wf);
        store.set_status(a, ExecutionStatus::Running);
        store.start(b, wf);
        store.complete(b, ExecutionStatus::Failed, Some("x".into()));

        let stats = store.stats();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.running, 1);
        assert_eq!(stats.failed, 1);
    }

    #[test]
    fn list_for_workflow_filters_and_sorts_descending() {
        let store = ExecutionStore::default();
        let wf_a = WorkflowId::v4();
        let wf_b = WorkflowId::v4();
        store.start(ExecutionId::v4(), wf_a);
        store.start(ExecutionId::v4(), wf_b);

        assert_eq!(store.list_for_workflow(wf_a).len(), 1);
        assert_eq!(store.list().len(), 2);
    }
}
