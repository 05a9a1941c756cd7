//! Multi-subscriber `EventBus` for minion change notifications.
//!
//! Provides a broadcast-capable event bus that allows multiple subscribers
//! to observe store and dependency changes.

use crate::event::MinionEvent;
use std::sync::Mutex;
use thiserror::Error;
use tokio::sync::broadcast;

/// Default channel capacity for the broadcast channel.
const DEFAULT_BROADCAST_CAPACITY: usize = 1000;

/// Multi-subscriber event bus.
///
/// Events published to this bus are broadcast to all current subscribers.
/// Publishing is synchronous, so an event is visible to subscribers as soon
/// as the mutation that produced it returns.
#[derive(Debug)]
pub struct EventBus {
    /// Broadcast sender (wrapped in Option for shutdown support).
    /// When `shutdown()` is called, this is set to None, which closes the
    /// channel for every subscriber.
    sender: Mutex<Option<broadcast::Sender<MinionEvent>>>,
}

impl EventBus {
    /// Create a new event bus.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_BROADCAST_CAPACITY)
    }

    /// Create a new event bus with a specific broadcast capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender: Mutex::new(Some(sender)),
        }
    }

    /// Publish an event to every subscriber.
    ///
    /// Having no subscribers is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`SendError::Closed`] if the bus has been shut down.
    pub fn publish(&self, event: MinionEvent) -> Result<(), SendError> {
        let guard = self.sender.lock().map_err(|_| SendError::Closed)?;
        let sender = guard.as_ref().ok_or(SendError::Closed)?;
        // Err only means nobody is listening right now
        let _ = sender.send(event);
        Ok(())
    }

    /// Shut down the event bus.
    ///
    /// Subscribers drain any buffered events and then observe the end of
    /// the stream. This method is safe to call multiple times.
    pub fn shutdown(&self) {
        if let Ok(mut guard) = self.sender.lock() {
            let _ = guard.take();
        }
    }

    /// Whether the bus has been shut down.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.sender.lock().map_or(true, |guard| guard.is_none())
    }

    /// Subscribe to events from this bus.
    ///
    /// Returns a receiver that will receive all events published after this
    /// subscription is created. Subscribing to a shut-down bus yields a
    /// receiver that is already closed.
    #[must_use]
    pub fn subscribe(&self) -> EventReceiver {
        let inner = self
            .sender
            .lock()
            .ok()
            .and_then(|guard| guard.as_ref().map(broadcast::Sender::subscribe))
            .unwrap_or_else(|| broadcast::channel(1).1);
        EventReceiver { inner }
    }

    /// Get the number of active subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender
            .lock()
            .ok()
            .and_then(|guard| guard.as_ref().map(broadcast::Sender::receiver_count))
            .unwrap_or(0)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiver handle for receiving events from an `EventBus`.
#[derive(Debug)]
pub struct EventReceiver {
    inner: broadcast::Receiver<MinionEvent>,
}

impl EventReceiver {
    /// Receive the next event.
    ///
    /// Returns `None` once the bus has been shut down and drained.
    /// May skip events if the receiver falls behind.
    pub async fn recv(&mut self) -> Option<MinionEvent> {
        loop {
            match self.inner.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Event receiver lagged, skipped events");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Try to receive an event without waiting.
    ///
    /// Returns `None` if no event is immediately available or the bus is closed.
    pub fn try_recv(&mut self) -> Option<MinionEvent> {
        loop {
            match self.inner.try_recv() {
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Event receiver lagged, skipped events");
                }
                Err(
                    broadcast::error::TryRecvError::Empty | broadcast::error::TryRecvError::Closed,
                ) => {
                    return None;
                }
            }
        }
    }

    /// Drain every event that is immediately available.
    pub fn drain(&mut self) -> Vec<MinionEvent> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }
}

/// Error returned when publishing to a closed bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SendError {
    /// The event bus has been closed.
    #[error("event bus is closed")]
    Closed,
}

#[cfg(test)]
#[allow(clippy::similar_names)]
mod tests {
    use super::*;
    use crate::event::StoreEvent;

    fn make_test_event() -> MinionEvent {
        MinionEvent::store(StoreEvent::Created {
            minion_id: "test".to_string(),
        })
    }

    #[test]
    fn test_publish_without_subscribers() {
        let bus = EventBus::new();
        assert_eq!(bus.subscriber_count(), 0);
        assert!(bus.publish(make_test_event()).is_ok());
    }

    #[tokio::test]
    async fn test_event_bus_send_receive() {
        let bus = EventBus::new();
        let mut receiver = bus.subscribe();

        let event = make_test_event();
        let event_id = event.id;

        bus.publish(event).unwrap();

        let received = receiver.recv().await.unwrap();
        assert_eq!(received.id, event_id);
    }

    #[tokio::test]
    async fn test_event_bus_multiple_subscribers() {
        let bus = EventBus::new();
        let mut receiver1 = bus.subscribe();
        let mut receiver2 = bus.subscribe();

        assert_eq!(bus.subscriber_count(), 2);

        let event = make_test_event();
        let event_id = event.id;

        bus.publish(event).unwrap();

        let received1 = receiver1.recv().await.unwrap();
        let received2 = receiver2.recv().await.unwrap();

        assert_eq!(received1.id, event_id);
        assert_eq!(received2.id, event_id);
    }

    #[test]
    fn test_events_visible_immediately() {
        let bus = EventBus::new();
        let mut receiver = bus.subscribe();

        bus.publish(make_test_event()).unwrap();
        bus.publish(make_test_event()).unwrap();

        assert_eq!(receiver.drain().len(), 2);
        assert!(receiver.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_shutdown_closes_subscribers() {
        let bus = EventBus::new();
        let mut receiver = bus.subscribe();

        bus.publish(make_test_event()).unwrap();
        bus.shutdown();
        bus.shutdown();

        assert!(bus.is_closed());
        assert_eq!(bus.publish(make_test_event()), Err(SendError::Closed));
        // Buffered event still delivered, then end of stream
        assert!(receiver.recv().await.is_some());
        assert!(receiver.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_subscribe_after_shutdown() {
        let bus = EventBus::new();
        bus.shutdown();
        let mut receiver = bus.subscribe();
        assert!(receiver.recv().await.is_none());
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_lagging_receiver_skips() {
        let bus = EventBus::with_capacity(2);
        let mut receiver = bus.subscribe();

        for _ in 0..5 {
            bus.publish(make_test_event()).unwrap();
        }

        assert_eq!(receiver.drain().len(), 2);
    }
}
