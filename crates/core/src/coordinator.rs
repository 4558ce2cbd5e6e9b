// Event coordinator
//
// Single writer over the device message stream. For every message, in order:
// 1. Duplicate: same status string as the previous message -> discard.
// 2. Idle: would not notify and equals the ready sentinel -> discard.
// 3. Otherwise record (retain + fan out), dispatch pushes in the background
//    and persist a snapshot.
// Reader errors are logged and the loop keeps polling.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::classify::classify;
use crate::device::DeviceReader;
use crate::dispatch::DispatchReport;
use crate::message::{DeviceMessage, Event};
use crate::relay::Relay;

/// Pause after a reader error before polling again
const READ_ERROR_BACKOFF: Duration = Duration::from_millis(250);

/// What the coordinator did with one message
#[derive(Debug)]
pub enum IngestOutcome {
    /// Same status as the previous message
    Duplicate,
    /// Resting state with nothing to notify
    Idle,
    /// Stored and published; `dispatch` is the detached push task, if any
    Recorded {
        event: Event,
        dispatch: Option<JoinHandle<DispatchReport>>,
    },
}

impl IngestOutcome {
    pub fn is_recorded(&self) -> bool {
        matches!(self, IngestOutcome::Recorded { .. })
    }
}

pub struct Coordinator {
    relay: Arc<Relay>,
    last_status: Option<String>,
}

impl Coordinator {
    pub fn new(relay: Arc<Relay>) -> Self {
        Self {
            relay,
            last_status: None,
        }
    }

    /// Apply the suppression rules and, if the message survives, record it.
    pub async fn handle_message(&mut self, message: DeviceMessage) -> IngestOutcome {
        if self.last_status.as_deref() == Some(message.status()) {
            return IngestOutcome::Duplicate;
        }
        self.last_status = Some(message.status().to_string());

        let config = self.relay.config();
        let verdict = classify(&message, &config.site_name);
        if !verdict.should_notify && message.status() == config.ready_message {
            tracing::debug!("Ready state, not recorded");
            return IngestOutcome::Idle;
        }

        let event = self.relay.record(message);

        let dispatch = verdict.should_notify.then(|| {
            let relay = self.relay.clone();
            let event = event.clone();
            tokio::spawn(async move { relay.notify(&event).await })
        });

        if let Err(e) = self.relay.persist().await {
            tracing::error!(error = %e, "Failed to save snapshot");
        }

        IngestOutcome::Recorded { event, dispatch }
    }

    /// Poll the reader until `shutdown` flips to true (or its sender is dropped).
    pub async fn run(
        mut self,
        mut reader: Box<dyn DeviceReader>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        tracing::info!("Ingest loop started");
        loop {
            if *shutdown.borrow() {
                break;
            }

            let result = tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
                result = reader.read() => result,
            };

            match result {
                Ok(message) => {
                    tracing::debug!(
                        status = %message.status(),
                        beeps = message.beeps,
                        "Device message"
                    );
                    self.handle_message(message).await;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Device read failed");
                    tokio::time::sleep(READ_ERROR_BACKOFF).await;
                }
            }
        }
        tracing::info!("Ingest loop stopped");
    }
}
