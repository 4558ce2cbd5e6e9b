// Notification dispatcher
//
// Builds one addressed message per subscriber token, sends the batch through
// the configured transport under a fixed timeout, and sorts the receipts.
// Delivery is attempted at most once per event: no retry, no backoff.
// Removing dead tokens from the registry is left to the caller, which owns
// the registry lock (see Relay::notify).

use std::sync::Arc;
use std::time::Duration;

use crate::classify::{classify, Classification};
use crate::message::Event;
use crate::push::{DeliveryOutcome, Priority, PushError, PushMessage, PushTransport};

/// Default bound on one dispatch call
pub const DEFAULT_DISPATCH_TIMEOUT: Duration = Duration::from_secs(60);

/// Summary of one dispatch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Messages handed to the transport (0 when skipped)
    pub sent: usize,
    pub delivered: usize,
    pub failed: usize,
    /// Tokens the transport reported as permanently invalid
    pub invalid_tokens: Vec<String>,
    /// Registry entries removed as a consequence
    pub removed: usize,
}

impl DispatchReport {
    pub fn skipped(&self) -> bool {
        self.sent == 0
    }
}

pub struct Dispatcher {
    transport: Arc<dyn PushTransport>,
    site_name: String,
    timeout: Duration,
}

impl Dispatcher {
    pub fn new(
        transport: Arc<dyn PushTransport>,
        site_name: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            transport,
            site_name: site_name.into(),
            timeout,
        }
    }

    pub fn transport_name(&self) -> &'static str {
        self.transport.name()
    }

    pub fn classify(&self, event: &Event) -> Classification {
        classify(&event.message, &self.site_name)
    }

    /// Push `event` to `tokens`.
    ///
    /// Skips the transport entirely when the event does not warrant a
    /// notification or there is nobody to notify.
    pub async fn dispatch(
        &self,
        event: &Event,
        tokens: Vec<String>,
    ) -> Result<DispatchReport, PushError> {
        let classification = self.classify(event);
        if !classification.should_notify || tokens.is_empty() {
            return Ok(DispatchReport::default());
        }

        let messages = build_batch(&classification, event, tokens);
        let sent = messages.len();
        tracing::info!(
            transport = self.transport.name(),
            count = sent,
            urgent = classification.urgent,
            title = %classification.title,
            "Sending push notifications"
        );

        let receipts = tokio::time::timeout(self.timeout, self.transport.send_batch(messages))
            .await
            .map_err(|_| PushError::Timeout(self.timeout))??;

        let mut report = DispatchReport {
            sent,
            ..Default::default()
        };
        for receipt in receipts {
            match receipt.outcome {
                DeliveryOutcome::Delivered => report.delivered += 1,
                DeliveryOutcome::InvalidDestination => report.invalid_tokens.push(receipt.token),
                DeliveryOutcome::Failed(reason) => {
                    tracing::warn!(to = %receipt.token, reason = %reason, "Push delivery failed");
                    report.failed += 1;
                }
            }
        }
        Ok(report)
    }
}

/// One message per token, all sharing the event's verdict.
pub fn build_batch(
    classification: &Classification,
    event: &Event,
    tokens: Vec<String>,
) -> Vec<PushMessage> {
    let priority = if classification.urgent {
        Priority::High
    } else {
        Priority::Default
    };
    tokens
        .into_iter()
        .map(|to| PushMessage {
            to,
            title: classification.title.clone(),
            body: event.status().to_string(),
            priority,
            ttl_seconds: classification.ttl_seconds,
            channel: classification.channel,
        })
        .collect()
}
