// Live listener hub
//
// Tracks connected streaming consumers and fans new events out to them.
//
// Slow-consumer policy: every listener owns a small bounded queue and the
// producer only ever uses `try_send`. When a queue is full the event is
// dropped for that listener alone; the connection stays open and the
// publisher (the ingest loop) never waits. This is a live tail, not a
// durable log: a lagging client loses intermediate events, everybody else
// is unaffected.

use std::collections::HashMap;

use tokio::sync::mpsc::{self, error::TrySendError};

use crate::message::Event;

/// Default per-listener queue capacity
pub const DEFAULT_LISTENER_CAPACITY: usize = 10;

/// Process-lifetime unique listener identifier
pub type ListenerId = u64;

/// Result of one fan-out pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishStats {
    /// Listeners that accepted the event
    pub delivered: usize,
    /// Listeners whose queue was full
    pub dropped: usize,
    /// Listeners found disconnected and removed
    pub closed: usize,
}

/// Set of live listeners with their outbound queues
#[derive(Debug)]
pub struct ListenerHub {
    next_id: ListenerId,
    capacity: usize,
    listeners: HashMap<ListenerId, mpsc::Sender<Event>>,
}

impl ListenerHub {
    pub fn new(capacity: usize) -> Self {
        Self {
            next_id: 0,
            capacity: capacity.max(1),
            listeners: HashMap::new(),
        }
    }

    /// Allocate a listener and its bounded queue.
    pub fn subscribe(&mut self) -> (ListenerId, mpsc::Receiver<Event>) {
        let id = self.next_id;
        self.next_id += 1;
        let (tx, rx) = mpsc::channel(self.capacity);
        self.listeners.insert(id, tx);
        tracing::debug!(listener_id = id, listeners = self.listeners.len(), "Listener added");
        (id, rx)
    }

    /// Remove a listener, closing its queue. Idempotent.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let removed = self.listeners.remove(&id).is_some();
        if removed {
            tracing::debug!(listener_id = id, listeners = self.listeners.len(), "Listener removed");
        }
        removed
    }

    /// Offer the event to every listener without blocking.
    pub fn publish(&mut self, event: &Event) -> PublishStats {
        let mut stats = PublishStats::default();
        let mut gone = Vec::new();

        for (id, tx) in &self.listeners {
            match tx.try_send(event.clone()) {
                Ok(()) => stats.delivered += 1,
                Err(TrySendError::Full(_)) => {
                    tracing::debug!(listener_id = id, "Listener queue full, dropping event");
                    stats.dropped += 1;
                }
                Err(TrySendError::Closed(_)) => gone.push(*id),
            }
        }

        for id in gone {
            self.listeners.remove(&id);
            stats.closed += 1;
        }

        stats
    }

    /// Close every queue (server shutdown). Returns how many were closed.
    pub fn close_all(&mut self) -> usize {
        let count = self.listeners.len();
        self.listeners.clear();
        count
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl Default for ListenerHub {
    fn default() -> Self {
        Self::new(DEFAULT_LISTENER_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::DeviceMessage;
    use chrono::Utc;

    fn event(status: &str) -> Event {
        Event::at(Utc::now(), DeviceMessage::with_status(status))
    }

    #[test]
    fn test_ids_are_monotonic() {
        let mut hub = ListenerHub::default();
        let (a, _ra) = hub.subscribe();
        let (b, _rb) = hub.subscribe();
        hub.unsubscribe(a);
        let (c, _rc) = hub.subscribe();

        assert!(a < b && b < c);
    }

    #[tokio::test]
    async fn test_publish_reaches_every_listener() {
        let mut hub = ListenerHub::default();
        let (_, mut rx1) = hub.subscribe();
        let (_, mut rx2) = hub.subscribe();

        let stats = hub.publish(&event("ALARM"));

        assert_eq!(stats.delivered, 2);
        assert_eq!(rx1.recv().await.unwrap().status(), "ALARM");
        assert_eq!(rx2.recv().await.unwrap().status(), "ALARM");
    }

    #[tokio::test]
    async fn test_full_listener_does_not_affect_others() {
        let mut hub = ListenerHub::new(2);
        let (_, mut slow) = hub.subscribe();
        let (_, mut fast) = hub.subscribe();

        let mut dropped = 0;
        for i in 0..5 {
            let stats = hub.publish(&event(&i.to_string()));
            dropped += stats.dropped;
            // fast listener drains promptly
            assert_eq!(fast.recv().await.unwrap().status(), i.to_string());
        }

        assert_eq!(dropped, 3);
        assert_eq!(hub.len(), 2);
        // slow listener kept the first two and lost the rest
        assert_eq!(slow.recv().await.unwrap().status(), "0");
        assert_eq!(slow.recv().await.unwrap().status(), "1");
        assert!(slow.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_unsubscribe_closes_queue_and_is_idempotent() {
        let mut hub = ListenerHub::default();
        let (id, mut rx) = hub.subscribe();

        assert!(hub.unsubscribe(id));
        assert!(!hub.unsubscribe(id));
        assert!(rx.recv().await.is_none());
        assert!(hub.is_empty());
    }

    #[test]
    fn test_dropped_receiver_is_pruned_on_publish() {
        let mut hub = ListenerHub::default();
        let (_, rx) = hub.subscribe();
        drop(rx);

        let stats = hub.publish(&event("x"));

        assert_eq!(stats.closed, 1);
        assert!(hub.is_empty());
    }

    #[tokio::test]
    async fn test_close_all() {
        let mut hub = ListenerHub::default();
        let (_, mut rx) = hub.subscribe();
        let (_, _rx2) = hub.subscribe();

        assert_eq!(hub.close_all(), 2);
        assert!(rx.recv().await.is_none());
    }
}
