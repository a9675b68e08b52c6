//! In-process change feed backed by a tokio broadcast channel.

use tokio::sync::broadcast;

use homectl_domain::event::Event;

/// Default number of changes buffered per subscriber.
pub const DEFAULT_CAPACITY: usize = 256;

/// Broadcast of every event accepted by the status cache.
///
/// With nobody listening a published change is discarded. A subscriber
/// that falls behind skips changes instead of blocking the cache.
#[derive(Debug)]
pub struct ChangeBus {
    sender: broadcast::Sender<Event>,
}

impl ChangeBus {
    /// Create a new bus with the given per-subscriber capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to changes.
    ///
    /// Returns a receiver that will get all events published *after*
    /// the subscription is created.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    pub fn publish(&self, event: Event) {
        // zero receivers is not an error
        let _ = self.sender.send(event);
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for ChangeBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use homectl_domain::event::{CustomState, Level};
    use homectl_domain::id::SensorId;

    use super::*;

    #[tokio::test]
    async fn should_deliver_event_to_multiple_subscribers() {
        let bus = ChangeBus::default();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.publish(Level::new(SensorId::new(1), "dimmer", 30).into());

        assert_eq!(rx1.recv().await.unwrap().serialize(), "30");
        assert_eq!(rx2.recv().await.unwrap().serialize(), "30");
    }

    #[tokio::test]
    async fn should_not_deliver_events_published_before_subscription() {
        let bus = ChangeBus::default();
        bus.publish(CustomState::new(SensorId::new(1), "mode", "early").into());

        let mut rx = bus.subscribe();
        bus.publish(CustomState::new(SensorId::new(1), "mode", "late").into());

        assert_eq!(rx.recv().await.unwrap().serialize(), "late");
    }

    #[test]
    fn should_succeed_when_no_subscribers() {
        let bus = ChangeBus::new(4);
        bus.publish(CustomState::new(SensorId::new(1), "mode", "x").into());
        assert_eq!(bus.subscriber_count(), 0);
    }
}
