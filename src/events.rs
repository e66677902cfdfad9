//! Agent event bus.
//!
//! A thin publish/subscribe layer over [`tokio::sync::broadcast`]. The sync
//! core subscribes to exactly one event kind: credential availability.

use tokio::sync::broadcast;

use crate::types::Credentials;

/// Events published on the agent bus.
#[derive(Debug, Clone)]
pub enum AgentEvent {
    /// Valid credentials became available (or were refreshed upstream).
    CredentialsAvailable(Credentials),
}

/// Broadcast bus for [`AgentEvent`]s.
///
/// Subscribers only observe events published after they subscribe; the
/// activation gate must therefore be spawned before the first publish.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<AgentEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AgentEvent> {
        self.sender.subscribe()
    }

    /// Publish an event to all current subscribers.
    ///
    /// An event published with no live subscribers is dropped; that is fine
    /// for this agent because the gate subscribes before anything publishes.
    pub fn publish(&self, event: AgentEvent) {
        let _ = self.sender.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(16)
    }
}
