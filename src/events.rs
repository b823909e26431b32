//! Best-effort publish/subscribe relay for ticket activity.
//!
//! Events are fanned out to whoever is subscribed at the moment of publishing.
//! There is no acknowledgement or replay: a subscriber that lags behind or
//! connects later simply misses events and is expected to re-fetch.

use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::models::TicketStatus;

const CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum TicketEvent {
    #[serde(rename_all = "camelCase")]
    TicketCreated {
        ticket_id: Uuid,
        key: String,
        reporter_id: Uuid,
    },
    #[serde(rename_all = "camelCase")]
    TicketUpdated {
        ticket_id: Uuid,
        status: TicketStatus,
        changes: serde_json::Value,
        actor_id: Uuid,
    },
    #[serde(rename_all = "camelCase")]
    CommentAdded {
        ticket_id: Uuid,
        comment_id: Uuid,
        author_id: Uuid,
    },
}

pub struct EventBus {
    sender: broadcast::Sender<TicketEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TicketEvent> {
        self.sender.subscribe()
    }

    /// Fire-and-forget. Returns how many subscribers received the event.
    pub fn publish(&self, event: TicketEvent) -> usize {
        match self.sender.send(event) {
            Ok(receivers) => receivers,
            Err(_) => {
                tracing::trace!("No subscribers for ticket event");
                0
            }
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
