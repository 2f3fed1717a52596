use serde::Serialize;
use tokio::sync::broadcast;

/// A named push event delivered to every connected admin websocket client, and (for `chat:*`
/// events) scoped to one conversation by the client filtering on `conversation_id`.
#[derive(Debug, Clone, Serialize)]
pub struct AdminEvent {
    pub name: &'static str,
    pub payload: serde_json::Value,
}

impl AdminEvent {
    pub fn new(name: &'static str, payload: impl Serialize) -> Self {
        Self {
            name,
            payload: serde_json::to_value(payload).unwrap_or(serde_json::Value::Null),
        }
    }
}

/// Process-wide fan-out for admin push events: `tunnel:status-changed` on tunnel start/stop,
/// `oauth:health-changed` on admin-triggered token refresh or pool toggling, and the
/// `chat:stream-*` events `ChatService` emits while streaming a reply. Health and circuit-breaker
/// transitions the bridge makes on its own mid-request (a pooled account expiring after a 401, a
/// provider's circuit opening) are not pushed here — they live one layer down in `gproxy-bridge`,
/// which has no dependency on this event bus, and are only observable by polling
/// `oauth:list-accounts` or the request log. Lagging subscribers drop the oldest events rather
/// than block publishers.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<AdminEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        let (sender, _) = broadcast::channel(256);
        Self { sender }
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, event: AdminEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AdminEvent> {
        self.sender.subscribe()
    }
}
