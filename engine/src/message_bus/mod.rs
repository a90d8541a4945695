//! Message bus for chat session and pipeline events
//!
//! Pub/sub over bounded channels. Components subscribe to one event type or
//! to `EventType::All`. Publishing never waits on a slow subscriber: an event
//! that does not fit in a full channel is dropped for that subscriber, and
//! subscribers whose receiver is gone are pruned.

use sdk::types::ConversationId;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, Mutex};
use tracing::debug;

/// Channel buffer size for bounded channels
const CHANNEL_BUFFER_SIZE: usize = 100;

/// Event types that can be subscribed to
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq)]
pub enum EventType {
    SessionEstablished,
    SessionTerminated,
    MessageReceived,
    ResponseEmitted,
    ShutdownRequested,
    /// Subscribe to all event types
    All,
}

/// Events published on the bus
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// The chat platform accepted our credentials
    SessionEstablished,
    /// The chat connection was lost
    SessionTerminated,
    /// A raw inbound message, unmodified
    MessageReceived {
        conversation_id: ConversationId,
        text: String,
    },
    /// A response was sent; `kind` is the response kind name
    ResponseEmitted {
        conversation_id: ConversationId,
        kind: String,
    },
    ShutdownRequested,
}

impl Event {
    /// Get the event type for this event
    pub fn event_type(&self) -> EventType {
        match self {
            Event::SessionEstablished => EventType::SessionEstablished,
            Event::SessionTerminated => EventType::SessionTerminated,
            Event::MessageReceived { .. } => EventType::MessageReceived,
            Event::ResponseEmitted { .. } => EventType::ResponseEmitted,
            Event::ShutdownRequested => EventType::ShutdownRequested,
        }
    }
}

/// Message bus for pub/sub communication between components
#[derive(Debug, Clone, Default)]
pub struct MessageBus {
    channels: Arc<Mutex<HashMap<EventType, Vec<mpsc::Sender<Event>>>>>,
}

impl MessageBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to a specific event type, or `EventType::All`
    pub async fn subscribe(&self, event_type: EventType) -> mpsc::Receiver<Event> {
        let (tx, rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);
        let mut channels = self.channels.lock().await;
        channels.entry(event_type).or_default().push(tx);
        rx
    }

    /// Publish an event to its type's subscribers and to `All` subscribers
    pub async fn publish(&self, event: Event) {
        let mut channels = self.channels.lock().await;
        let event_type = event.event_type();

        for key in [event_type, EventType::All] {
            if let Some(subscribers) = channels.get_mut(&key) {
                subscribers.retain(|tx| match tx.try_send(event.clone()) {
                    Ok(()) => true,
                    Err(TrySendError::Full(_)) => {
                        debug!(?event_type, "Subscriber channel full, dropping event");
                        true
                    }
                    Err(TrySendError::Closed(_)) => false,
                });
            }
        }
    }

    /// Number of live subscribers for an event type
    pub async fn subscriber_count(&self, event_type: EventType) -> usize {
        let channels = self.channels.lock().await;
        channels
            .get(&event_type)
            .map(|subscribers| subscribers.iter().filter(|tx| !tx.is_closed()).count())
            .unwrap_or(0)
    }
}
