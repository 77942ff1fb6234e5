//! # Event Publisher
//!
//! The bus itself: one per session, fed by the session's receive task.

use crate::events::{EngineErrorReport, EngineEvent, EventFilter, StageChanged};
use crate::listener::{spawn_listener, ListenerHandle};
use crate::subscriber::{EventStream, Subscription};
use crate::DEFAULT_CHANNEL_CAPACITY;
use docauth_telemetry::ENGINE_EVENTS_TOTAL;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;
use tracing::debug;

/// In-memory broadcast bus for engine events.
///
/// Uses `tokio::sync::broadcast`: publishing is a non-blocking send, and a
/// subscriber that falls behind by more than the channel capacity loses the
/// oldest events instead of slowing the publisher down.
pub struct EngineEventBus {
    /// Broadcast sender; `None` once the bus is closed.
    sender: RwLock<Option<broadcast::Sender<EngineEvent>>>,

    /// Total events published.
    events_published: AtomicU64,

    /// Channel capacity.
    capacity: usize,
}

impl EngineEventBus {
    /// Create a bus with default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a bus with the given capacity (at least 1).
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: RwLock::new(Some(sender)),
            events_published: AtomicU64::new(0),
            capacity,
        }
    }

    /// Publish an event to every current subscriber.
    ///
    /// Never blocks. Returns the number of subscribers the event reached;
    /// 0 when nobody listens or the bus is closed.
    pub fn publish(&self, event: EngineEvent) -> usize {
        let kind = event.kind();
        self.events_published.fetch_add(1, Ordering::Relaxed);
        ENGINE_EVENTS_TOTAL.with_label_values(&[kind.as_str()]).inc();

        let guard = self.sender.read();
        let Some(sender) = guard.as_ref() else {
            debug!(kind = kind.as_str(), "Event dropped (bus closed)");
            return 0;
        };

        match sender.send(event) {
            Ok(receivers) => {
                debug!(kind = kind.as_str(), receivers, "Event published");
                receivers
            }
            Err(_) => {
                debug!(kind = kind.as_str(), "Event dropped (no receivers)");
                0
            }
        }
    }

    /// Subscribe to events matching a filter.
    ///
    /// A subscription taken after [`close`](Self::close) is already ended.
    #[must_use]
    pub fn subscribe(&self, filter: EventFilter) -> Subscription {
        let receiver = match self.sender.read().as_ref() {
            Some(sender) => sender.subscribe(),
            None => broadcast::channel(1).1,
        };
        debug!(kinds = ?filter.kinds, request_id = ?filter.request_id, "New subscription created");
        Subscription::new(receiver, filter)
    }

    /// Get a stream of events matching a filter.
    #[must_use]
    pub fn event_stream(&self, filter: EventFilter) -> EventStream {
        self.subscribe(filter).into_stream()
    }

    /// Run `on_stage` / `on_error` for every event until cancelled or closed.
    ///
    /// Callbacks run on their own task; a panicking callback is logged,
    /// counted and skipped. Must be called from within a Tokio runtime.
    pub fn listen<S, E>(&self, on_stage: S, on_error: E) -> ListenerHandle
    where
        S: Fn(&StageChanged) + Send + 'static,
        E: Fn(&EngineErrorReport) + Send + 'static,
    {
        spawn_listener(self.subscribe(EventFilter::all()), on_stage, on_error)
    }

    /// Close the bus. Subscribers drain what is buffered, then end.
    ///
    /// Idempotent.
    pub fn close(&self) {
        if self.sender.write().take().is_some() {
            debug!("Event bus closed");
        }
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.sender.read().is_none()
    }

    /// Get the number of active subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender
            .read()
            .as_ref()
            .map_or(0, broadcast::Sender::receiver_count)
    }

    /// Total events handed to [`publish`](Self::publish), delivered or not.
    #[must_use]
    pub fn events_published(&self) -> u64 {
        self.events_published.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for EngineEventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EngineEventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineEventBus")
            .field("capacity", &self.capacity)
            .field("closed", &self.is_closed())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;

    #[test]
    fn test_publish_no_subscribers() {
        let bus = EngineEventBus::new();
        let receivers = bus.publish(EngineEvent::stage(None, "Loading"));
        assert_eq!(receivers, 0);
        assert_eq!(bus.events_published(), 1);
    }

    #[test]
    fn test_publish_with_subscribers() {
        let bus = EngineEventBus::new();

        let _sub1 = bus.subscribe(EventFilter::all());
        let _sub2 = bus.subscribe(EventFilter::kinds(vec![EventKind::Error]));

        // Filtering happens on receive, so both subscribers count.
        let receivers = bus.publish(EngineEvent::stage(None, "Loading"));
        assert_eq!(receivers, 2);
        assert_eq!(bus.subscriber_count(), 2);
    }

    #[test]
    fn test_subscription_drop_cleanup() {
        let bus = EngineEventBus::new();
        {
            let _sub1 = bus.subscribe(EventFilter::all());
            let _sub2 = bus.subscribe(EventFilter::all());
            assert_eq!(bus.subscriber_count(), 2);
        }
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_close_is_idempotent() {
        let bus = EngineEventBus::new();
        let _sub = bus.subscribe(EventFilter::all());

        bus.close();
        bus.close();

        assert!(bus.is_closed());
        assert_eq!(bus.subscriber_count(), 0);
        assert_eq!(bus.publish(EngineEvent::error(None, "late")), 0);
    }

    #[test]
    fn test_subscribe_after_close_is_ended() {
        let bus = EngineEventBus::new();
        bus.close();
        let mut sub = bus.subscribe(EventFilter::all());
        assert!(sub.try_recv().is_err());
    }

    #[test]
    fn test_default_bus() {
        let bus = EngineEventBus::default();
        assert_eq!(bus.capacity(), DEFAULT_CHANNEL_CAPACITY);
        assert_eq!(bus.subscriber_count(), 0);
        assert_eq!(bus.events_published(), 0);
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        assert_eq!(EngineEventBus::with_capacity(0).capacity(), 1);
    }
}
