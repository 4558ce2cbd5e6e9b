// In-memory implementations for examples and testing
//
// - MemorySnapshotStore: keeps the last snapshot in a mutex, optionally
//   seeded or made to fail on save
// - RecordingTransport: records every batch and answers with scripted
//   per-token outcomes

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::{RelayError, Result};
use crate::persistence::{Snapshot, SnapshotStore};
use crate::push::{DeliveryOutcome, DeliveryReceipt, PushError, PushMessage, PushTransport};

// ============================================================================
// MemorySnapshotStore
// ============================================================================

#[derive(Default)]
pub struct MemorySnapshotStore {
    snapshot: Mutex<Option<Snapshot>>,
    saves: Mutex<usize>,
    fail_saves: bool,
    fail_loads: bool,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that starts out holding `snapshot`
    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        Self {
            snapshot: Mutex::new(Some(snapshot)),
            ..Default::default()
        }
    }

    /// Store whose saves always fail
    pub fn failing() -> Self {
        Self {
            fail_saves: true,
            ..Default::default()
        }
    }

    /// Store whose stored data cannot be parsed
    pub fn corrupt() -> Self {
        Self {
            fail_loads: true,
            ..Default::default()
        }
    }

    pub fn current(&self) -> Option<Snapshot> {
        self.snapshot.lock().clone()
    }

    pub fn save_count(&self) -> usize {
        *self.saves.lock()
    }
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn load(&self) -> Result<Option<Snapshot>> {
        if self.fail_loads {
            return Err(RelayError::persistence("stored snapshot is unreadable"));
        }
        Ok(self.snapshot.lock().clone())
    }

    async fn save(&self, snapshot: &Snapshot) -> Result<()> {
        if self.fail_saves {
            return Err(RelayError::persistence("disk full"));
        }
        *self.snapshot.lock() = Some(snapshot.clone());
        *self.saves.lock() += 1;
        Ok(())
    }
}

// ============================================================================
// RecordingTransport
// ============================================================================

/// Push transport that records batches instead of sending them.
///
/// Tokens without a scripted outcome are reported as delivered.
#[derive(Default)]
pub struct RecordingTransport {
    batches: Mutex<Vec<Vec<PushMessage>>>,
    outcomes: HashMap<String, DeliveryOutcome>,
    delay: Option<Duration>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_outcome(mut self, token: impl Into<String>, outcome: DeliveryOutcome) -> Self {
        self.outcomes.insert(token.into(), outcome);
        self
    }

    /// Sleep this long before answering each batch
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn batches(&self) -> Vec<Vec<PushMessage>> {
        self.batches.lock().clone()
    }
}

#[async_trait]
impl PushTransport for RecordingTransport {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn send_batch(
        &self,
        messages: Vec<PushMessage>,
    ) -> std::result::Result<Vec<DeliveryReceipt>, PushError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let receipts = messages
            .iter()
            .map(|m| {
                let outcome = self
                    .outcomes
                    .get(&m.to)
                    .cloned()
                    .unwrap_or(DeliveryOutcome::Delivered);
                DeliveryReceipt::new(m.to.clone(), outcome)
            })
            .collect();
        self.batches.lock().push(messages);
        Ok(receipts)
    }
}
