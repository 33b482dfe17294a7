//! Engine-wide tunable defaults — the ambient-config counterpart of spec
//! §4.3, the way `conduit_eventbus::EventBusConfig` and
//! `conduit_execution::StoreConfig` configure their own components.

use serde::{Deserialize, Serialize};

/// Tunables applied across every execution a [`crate::WorkflowEngine`]
/// instance runs, unless a node's own config overrides them.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Fallback timeout in milliseconds for a `trigger`/await node that
    /// doesn't specify its own `timeout` (spec §3: "optional timeout").
    /// `None` means such nodes wait indefinitely.
    pub default_await_timeout_ms: Option<u64>,
}

impl EngineConfig {
    /// Config with every knob at its default (no default await timeout).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the fallback await timeout.
    #[must_use]
    pub fn with_default_await_timeout_ms(mut self, millis: u64) -> Self {
        self.default_await_timeout_ms = Some(millis);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_no_fallback_timeout() {
        assert_eq!(EngineConfig::new().default_await_timeout_ms, None);
    }

    #[test]
    fn with_default_await_timeout_ms_sets_it() {
        let config = EngineConfig::new().with_default_await_timeout_ms(30_000);
        assert_eq!(config.default_await_timeout_ms, Some(30_000));
    }
}
