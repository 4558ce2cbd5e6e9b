// Alarm relay core
//
// Relays alarm panel state changes to remote subscribers along two paths:
// a live stream fan-out to connected viewers and push notifications to
// registered phones, with best-effort persistence of recent history.
//
// Key design decisions:
// - HTTP-agnostic: the server crate only talks to Relay and the traits here
// - Pluggable edges via traits (DeviceReader, PushTransport, SnapshotStore)
// - One coarse lock over registry + buffer + listener set (see relay.rs)
// - Live listeners get bounded queues with drop-on-full (see hub.rs)
// - Push dispatch runs off the ingest path, at most once per event

pub mod classify;
pub mod coordinator;
pub mod device;
pub mod dispatch;
pub mod error;
pub mod hub;
pub mod message;
pub mod persistence;
pub mod push;
pub mod registry;
pub mod relay;
pub mod retention;

// In-memory implementations for examples and testing
pub mod memory;

// Re-exports for convenience
pub use classify::{classify, Channel, Classification, Tier};
pub use coordinator::{Coordinator, IngestOutcome};
pub use device::{DeviceReader, ScriptedReader};
pub use dispatch::{DispatchReport, Dispatcher};
pub use error::{RelayError, Result};
pub use hub::{ListenerHub, ListenerId, PublishStats};
pub use message::{DeviceMessage, Event};
pub use persistence::{JsonFileStore, Snapshot, SnapshotStore};
pub use push::{
    DeliveryOutcome, DeliveryReceipt, LogTransport, Priority, PushError, PushMessage,
    PushTransport,
};
pub use registry::SubscriberRegistry;
pub use relay::{Relay, RelayConfig, RelayStats, Subscription, DEFAULT_READY_MESSAGE};
pub use retention::RetentionBuffer;
