//! Per-source ownership index and reload delta computation (spec §4.8).
//!
//! One [`Index`] instance tracks workflow ids owned per file; a second,
//! separate instance tracks procedure names owned per module. Both sides
//! share this one implementation since the delta rule is identical:
//! previously-owned names not in the new set are `removed`, new names not
//! previously owned are `added`, names present in both are `updated` (a
//! reload always re-applies, even when the owned name set didn't change).

use std::collections::HashSet;

use dashmap::DashMap;

/// The added/updated/removed names produced by reloading one source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Delta {
    /// Names newly owned by this source.
    pub added: Vec<String>,
    /// Names this source owned before and still owns.
    pub updated: Vec<String>,
    /// Names this source owned before but no longer does.
    pub removed: Vec<String>,
}

impl Delta {
    /// Whether this delta changes nothing at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.updated.is_empty() && self.removed.is_empty()
    }
}

/// Tracks which names each source (file path or module name) currently
/// owns, so a re-scan can be diffed against the prior scan.
#[derive(Default)]
pub struct Index {
    owned_by_source: DashMap<String, HashSet<String>>,
}

impl Index {
    /// Create an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute the delta a reload of `source` with `new_names` would
    /// produce, without committing it. Callers apply the delta to a
    /// registry first and only call [`Index::commit`] on success, so a
    /// failed reload never mutates the index (spec §4.8).
    #[must_use]
    pub fn compute_delta(&self, source: &str, new_names: &HashSet<String>) -> Delta {
        let previous = self.owned_by_source.get(source).map(|entry| entry.value().clone()).unwrap_or_default();

        let added = new_names.difference(&previous).cloned().collect();
        let updated = new_names.intersection(&previous).cloned().collect();
        let removed = previous.difference(new_names).cloned().collect();
        Delta { added, updated, removed }
    }

    /// Record that `source` now owns exactly `new_names`, replacing
    /// whatever it owned before.
    pub fn commit(&self, source: String, new_names: HashSet<String>) {
        if new_names.is_empty() {
            self.owned_by_source.remove(&source);
        } else {
            self.owned_by_source.insert(source, new_names);
        }
    }

    /// Drop a source entirely, returning the names it owned.
    pub fn forget(&self, source: &str) -> HashSet<String> {
        self.owned_by_source.remove(source).map(|(_, names)| names).unwrap_or_default()
    }

    /// Every source currently tracked by this index.
    #[must_use]
    pub fn known_sources(&self) -> Vec<String> {
        self.owned_by_source.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Number of sources currently tracked.
    #[must_use]
    pub fn len(&self) -> usize {
        self.owned_by_source.len()
    }

    /// Whether no sources are tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.owned_by_source.is_empty()
    }
}
