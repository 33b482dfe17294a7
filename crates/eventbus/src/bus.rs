//! The event bus itself: a global topic plus lazily-created per-execution
//! topics (spec §4.6).

use conduit_core::ExecutionId;
use dashmap::DashMap;
use tokio::sync::broadcast;

use crate::event::Event;

/// Tunable knobs for the bus — the ambient-config counterpart of spec §4.6.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct EventBusConfig {
    /// Backlog capacity of each broadcast channel (global and per-execution).
    /// A slow subscriber that falls more than this many events behind
    /// silently drops the oldest ones on its next recv — delivery is
    /// best-effort by design (spec §4.6).
    pub channel_capacity: usize,
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 256,
        }
    }
}

/// A live subscription to either the global topic or one execution's topic.
///
/// Dropping this (or calling [`EventSubscription::unsubscribe`] explicitly)
/// removes the receiver; it does not affect other subscribers or close the
/// topic itself.
pub struct EventSubscription {
    receiver: broadcast::Receiver<Event>,
}

impl EventSubscription {
    /// Await the next event, or `None` once the topic has closed (the
    /// execution reached a terminal state) and no more events will arrive.
    pub async fn recv(&mut self) -> Option<Event> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Explicit, self-documenting alternative to `drop(sub)`.
    pub fn unsubscribe(self) {
        drop(self);
    }
}

/// Topic-based fan-out for procedure, node, and workflow lifecycle events.
///
/// Two scopes, per spec §4.6: a single global topic every event is
/// published to, and one topic per execution that only that execution's
/// events land on. Publishing is fire-and-forget — a lagging or absent
/// subscriber never blocks or panics the publisher.
pub struct EventBus {
    config: EventBusConfig,
    global: broadcast::Sender<Event>,
    topics: DashMap<ExecutionId, broadcast::Sender<Event>>,
}

impl EventBus {
    /// Create a bus with the given configuration.
    #[must_use]
    pub fn new(config: EventBusConfig) -> Self {
        let (global, _) = broadcast::channel(config.channel_capacity);
        Self {
            config,
            global,
            topics: DashMap::new(),
        }
    }

    /// Subscribe to every event published on the bus, across all executions.
    pub fn subscribe_all(&self) -> EventSubscription {
        EventSubscription {
            receiver: self.global.subscribe(),
        }
    }

    /// Subscribe to one execution's topic. The topic is created on first
    /// use and torn down when the execution emits a terminal event.
    ///
    /// A subscription created *after* the execution already terminated
    /// receives nothing further — the bus does not replay past events
    /// (spec §4.6, §6.6).
    pub fn subscribe(&self, execution_id: ExecutionId) -> EventSubscription {
        let sender = self
            .topics
            .entry(execution_id)
            .or_insert_with(|| broadcast::channel(self.config.channel_capacity).0)
            .clone();
        EventSubscription {
            receiver: sender.subscribe(),
        }
    }

    /// Publish an event to the global topic and, if scoped to an
    /// execution, that execution's topic. Closes the execution's topic
    /// immediately afterward if this event is terminal.
    pub fn publish(&self, event: Event) {
        // `send` errors only when there are no receivers; that's the
        // expected steady state for best-effort delivery, not a failure.
        let _ = self.global.send(event.clone());

        if let Some(execution_id) = event.execution_id() {
            if let Some(sender) = self.topics.get(&execution_id) {
                let _ = sender.send(event.clone());
            }
            if event.is_terminal() {
                self.topics.remove(&execution_id);
            }
        }

        tracing::debug!(kind = event.kind(), "event published");
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(EventBusConfig::default())
    }
}
