// Relay service object
//
// Owns the shared state (subscriber registry, retention buffer, listener set)
// behind one lock, plus the dispatcher and the snapshot store. Handlers and
// the ingest loop get it as Arc<Relay>.
//
// Locking rules:
// - `state` is a parking_lot mutex and is never held across an .await.
// - Registry + buffer are captured together for every snapshot.
// - Subscribe reads the backlog and registers the listener in the same
//   critical section in which `record` appends and publishes, so a client
//   sees each event exactly once: either in its backlog or live.
// - `save_lock` spans capture + write, so snapshots reach the store in
//   capture order.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::mpsc;

use crate::dispatch::{DispatchReport, Dispatcher, DEFAULT_DISPATCH_TIMEOUT};
use crate::error::{RelayError, Result};
use crate::hub::{ListenerHub, ListenerId, DEFAULT_LISTENER_CAPACITY};
use crate::message::{DeviceMessage, Event};
use crate::persistence::{Snapshot, SnapshotStore};
use crate::push::PushTransport;
use crate::registry::SubscriberRegistry;
use crate::retention::{default_max_age, RetentionBuffer};

/// Keypad text shown while the panel is disarmed and idle
pub const DEFAULT_READY_MESSAGE: &str = "****DISARMED****  READY TO ARM";

/// Tunables for the relay core
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Site name appended to notification titles
    pub site_name: String,
    /// Status string of the resting state, not recorded unless it notifies
    pub ready_message: String,
    /// Retention horizon
    pub max_age: chrono::Duration,
    /// Per-listener queue capacity
    pub listener_capacity: usize,
    /// Bound on one push dispatch
    pub dispatch_timeout: Duration,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            site_name: String::new(),
            ready_message: DEFAULT_READY_MESSAGE.to_string(),
            max_age: default_max_age(),
            listener_capacity: DEFAULT_LISTENER_CAPACITY,
            dispatch_timeout: DEFAULT_DISPATCH_TIMEOUT,
        }
    }
}

impl RelayConfig {
    pub fn validate(&self) -> Result<()> {
        if self.site_name.trim().is_empty() {
            return Err(RelayError::config("site name must be specified"));
        }
        if self.max_age <= chrono::Duration::zero() {
            return Err(RelayError::config("retention horizon must be positive"));
        }
        Ok(())
    }
}

/// Everything guarded by the relay lock
#[derive(Debug)]
pub struct RelayState {
    pub registry: SubscriberRegistry,
    pub buffer: RetentionBuffer,
    pub hub: ListenerHub,
}

/// Backlog plus live queue handed to a new stream client
#[derive(Debug)]
pub struct Subscription {
    pub id: ListenerId,
    pub backlog: Vec<Event>,
    pub receiver: mpsc::Receiver<Event>,
}

/// Point-in-time counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RelayStats {
    pub events: usize,
    pub subscribers: usize,
    pub listeners: usize,
}

pub struct Relay {
    config: RelayConfig,
    state: Mutex<RelayState>,
    store: Arc<dyn SnapshotStore>,
    save_lock: tokio::sync::Mutex<()>,
    dispatcher: Dispatcher,
}

impl Relay {
    /// Build the relay, restoring whatever the store holds.
    ///
    /// A missing snapshot starts empty. An unreadable one is logged and also
    /// starts empty: availability wins over the lost history.
    pub async fn open(
        config: RelayConfig,
        store: Arc<dyn SnapshotStore>,
        transport: Arc<dyn PushTransport>,
    ) -> Result<Self> {
        config.validate()?;

        let snapshot = match store.load().await {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => {
                tracing::info!("No saved state, starting empty");
                Snapshot::default()
            }
            Err(e) => {
                tracing::warn!(error = %e, "Saved state unreadable, starting empty");
                Snapshot::default()
            }
        };

        let buffer = RetentionBuffer::from_events(snapshot.events, config.max_age, Utc::now());
        tracing::info!(
            events = buffer.len(),
            subscribers = snapshot.subscribers.len(),
            transport = transport.name(),
            "Relay state restored"
        );

        let state = RelayState {
            registry: snapshot.subscribers,
            buffer,
            hub: ListenerHub::new(config.listener_capacity),
        };
        let dispatcher =
            Dispatcher::new(transport, config.site_name.clone(), config.dispatch_timeout);

        Ok(Self {
            config,
            state: Mutex::new(state),
            store,
            save_lock: tokio::sync::Mutex::new(()),
            dispatcher,
        })
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    // ============================================
    // Subscribers
    // ============================================

    /// Upsert a push recipient and persist.
    pub async fn register(&self, identity: &str, token: &str) -> Result<()> {
        self.state.lock().registry.register(identity, token);
        tracing::info!(installation_id = %identity, "Push token registered");
        self.persist().await
    }

    /// Drop every registration using `token`. Returns how many were removed.
    pub fn unregister_token(&self, token: &str) -> usize {
        let removed = self.state.lock().registry.unregister_by_token(token);
        for identity in &removed {
            tracing::info!(installation_id = %identity, "Removed unregistered push token");
        }
        removed.len()
    }

    pub fn tokens(&self) -> Vec<String> {
        self.state.lock().registry.list_tokens()
    }

    // ============================================
    // Events and listeners
    // ============================================

    /// Stamp, retain and fan out one message. Returns the stored event.
    pub fn record(&self, message: DeviceMessage) -> Event {
        let mut state = self.state.lock();
        let now = Utc::now();
        // keep timestamps non-decreasing even if the wall clock steps back
        let time = state.buffer.latest().map_or(now, |last| last.time.max(now));
        let event = Event::at(time, message);

        state.buffer.append(event.clone(), now);
        let stats = state.hub.publish(&event);
        tracing::debug!(
            status = %event.status(),
            retained = state.buffer.len(),
            delivered = stats.delivered,
            dropped = stats.dropped,
            "Event recorded"
        );
        event
    }

    /// Register a live listener together with the current backlog.
    pub fn subscribe(&self) -> Subscription {
        let mut state = self.state.lock();
        let backlog = state.buffer.snapshot(None);
        let (id, receiver) = state.hub.subscribe();
        Subscription {
            id,
            backlog,
            receiver,
        }
    }

    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        self.state.lock().hub.unsubscribe(id)
    }

    /// Close every live stream (shutdown).
    pub fn close_listeners(&self) -> usize {
        self.state.lock().hub.close_all()
    }

    /// Copy of up to `limit` most recent events
    pub fn recent_events(&self, limit: Option<usize>) -> Vec<Event> {
        self.state.lock().buffer.snapshot(limit)
    }

    pub fn stats(&self) -> RelayStats {
        let state = self.state.lock();
        RelayStats {
            events: state.buffer.len(),
            subscribers: state.registry.len(),
            listeners: state.hub.len(),
        }
    }

    // ============================================
    // Notifications
    // ============================================

    /// Push `event` to every registered token and forget tokens the
    /// transport reports as dead. Never fails: errors are logged.
    pub async fn notify(&self, event: &Event) -> DispatchReport {
        let tokens = self.tokens();
        let mut report = match self.dispatcher.dispatch(event, tokens).await {
            Ok(report) => report,
            Err(e) => {
                tracing::warn!(error = %e, status = %event.status(), "Push dispatch failed");
                return DispatchReport::default();
            }
        };

        for token in &report.invalid_tokens {
            report.removed += self.unregister_token(token);
        }
        if report.removed > 0 {
            if let Err(e) = self.persist().await {
                tracing::error!(error = %e, "Failed to save after token cleanup");
            }
        }
        report
    }

    // ============================================
    // Persistence
    // ============================================

    /// Registry and buffer captured together
    pub fn snapshot(&self) -> Snapshot {
        let state = self.state.lock();
        Snapshot {
            subscribers: state.registry.clone(),
            events: state.buffer.snapshot(None),
        }
    }

    /// Write the current snapshot to the store.
    pub async fn persist(&self) -> Result<()> {
        let _guard = self.save_lock.lock().await;
        let snapshot = self.snapshot();
        self.store.save(&snapshot).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemorySnapshotStore, RecordingTransport};
    use crate::push::DeliveryOutcome;

    fn config() -> RelayConfig {
        RelayConfig {
            site_name: "Home".to_string(),
            ..Default::default()
        }
    }

    async fn relay_with(
        store: Arc<MemorySnapshotStore>,
        transport: Arc<RecordingTransport>,
    ) -> Relay {
        Relay::open(config(), store, transport).await.unwrap()
    }

    fn alarm() -> DeviceMessage {
        DeviceMessage {
            keypad_message: "ALARM SOUNDING".to_string(),
            alarm_sounding: true,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_open_rejects_missing_site_name() {
        let result = Relay::open(
            RelayConfig::default(),
            Arc::new(MemorySnapshotStore::new()),
            Arc::new(RecordingTransport::new()),
        )
        .await;

        assert!(matches!(result, Err(RelayError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_open_with_corrupt_store_starts_empty() {
        let relay = relay_with(
            Arc::new(MemorySnapshotStore::corrupt()),
            Arc::new(RecordingTransport::new()),
        )
        .await;

        assert_eq!(
            relay.stats(),
            RelayStats {
                events: 0,
                subscribers: 0,
                listeners: 0
            }
        );
    }

    #[tokio::test]
    async fn test_open_restores_subscribers_and_drops_expired_events() {
        let mut subscribers = SubscriberRegistry::new();
        subscribers.register("A", "tok1");
        let now = Utc::now();
        let store = Arc::new(MemorySnapshotStore::with_snapshot(Snapshot {
            subscribers,
            events: vec![
                Event::at(now - chrono::Duration::days(8), DeviceMessage::with_status("old")),
                Event::at(now, DeviceMessage::with_status("fresh")),
            ],
        }));

        let relay = relay_with(store, Arc::new(RecordingTransport::new())).await;

        assert_eq!(relay.tokens(), vec!["tok1".to_string()]);
        let events = relay.recent_events(None);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].status(), "fresh");
        assert_eq!(relay.dispatcher().transport_name(), "recording");
    }

    #[tokio::test]
    async fn test_register_persists_snapshot() {
        let store = Arc::new(MemorySnapshotStore::new());
        let relay = relay_with(store.clone(), Arc::new(RecordingTransport::new())).await;

        relay.register("A", "tok1").await.unwrap();

        let saved = store.current().unwrap();
        assert_eq!(saved.subscribers.token_for("A"), Some("tok1"));
        assert_eq!(relay.tokens(), vec!["tok1".to_string()]);
    }

    #[tokio::test]
    async fn test_register_surfaces_save_failure() {
        let relay = relay_with(
            Arc::new(MemorySnapshotStore::failing()),
            Arc::new(RecordingTransport::new()),
        )
        .await;

        assert!(relay.register("A", "tok1").await.is_err());
    }

    #[tokio::test]
    async fn test_subscribe_returns_backlog_then_live() {
        let relay = relay_with(
            Arc::new(MemorySnapshotStore::new()),
            Arc::new(RecordingTransport::new()),
        )
        .await;
        relay.record(DeviceMessage::with_status("before"));

        let mut sub = relay.subscribe();
        relay.record(DeviceMessage::with_status("after"));

        assert_eq!(sub.backlog.len(), 1);
        assert_eq!(sub.backlog[0].status(), "before");
        assert_eq!(sub.receiver.recv().await.unwrap().status(), "after");
        assert!(sub.receiver.try_recv().is_err());

        assert!(relay.unsubscribe(sub.id));
        assert_eq!(relay.stats().listeners, 0);
    }

    #[tokio::test]
    async fn test_record_keeps_timestamps_ordered() {
        let relay = relay_with(
            Arc::new(MemorySnapshotStore::new()),
            Arc::new(RecordingTransport::new()),
        )
        .await;

        for i in 0..20 {
            relay.record(DeviceMessage::with_status(i.to_string()));
        }

        let events = relay.recent_events(None);
        assert!(events.windows(2).all(|w| w[0].time <= w[1].time));
        assert_eq!(relay.recent_events(Some(3)).len(), 3);
    }

    #[tokio::test]
    async fn test_notify_removes_invalid_tokens_and_persists() {
        let store = Arc::new(MemorySnapshotStore::new());
        let transport = Arc::new(
            RecordingTransport::new().with_outcome("dead", DeliveryOutcome::InvalidDestination),
        );
        let relay = relay_with(store.clone(), transport).await;
        relay.register("A", "dead").await.unwrap();
        relay.register("B", "alive").await.unwrap();
        let saves_before = store.save_count();

        let event = relay.record(alarm());
        let report = relay.notify(&event).await;

        assert_eq!(report.sent, 2);
        assert_eq!(report.removed, 1);
        assert_eq!(relay.tokens(), vec!["alive".to_string()]);
        assert_eq!(store.save_count(), saves_before + 1);
        assert!(store.current().unwrap().subscribers.token_for("A").is_none());

        relay.register("A", "fresh").await.unwrap();
        assert!(relay.tokens().contains(&"fresh".to_string()));
    }

    #[tokio::test]
    async fn test_state_survives_reopen() {
        let store = Arc::new(MemorySnapshotStore::new());
        let transport = Arc::new(RecordingTransport::new());
        let relay = relay_with(store.clone(), transport.clone()).await;
        relay.register("A", "tok1").await.unwrap();
        relay.record(alarm());
        relay.persist().await.unwrap();
        let before = relay.snapshot();

        let reopened = relay_with(store, transport).await;

        assert_eq!(reopened.snapshot(), before);
    }
}
