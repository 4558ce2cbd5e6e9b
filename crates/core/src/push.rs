// Push transport port
//
// A transport accepts one batch of addressed messages and reports a
// per-message outcome. Transport-specific wire types stay behind this trait;
// the coordinator and classifier only ever see PushMessage and DeliveryOutcome.

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

use crate::classify::Channel;

/// Delivery priority requested from the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Default,
    High,
}

/// One notification addressed to one delivery token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushMessage {
    pub to: String,
    pub title: String,
    pub body: String,
    pub priority: Priority,
    pub ttl_seconds: u32,
    pub channel: Channel,
}

/// What happened to a single message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered,
    /// The destination token is permanently invalid and should be forgotten
    InvalidDestination,
    /// Any other per-message failure
    Failed(String),
}

/// Outcome for the message addressed to `token`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReceipt {
    pub token: String,
    pub outcome: DeliveryOutcome,
}

impl DeliveryReceipt {
    pub fn new(token: impl Into<String>, outcome: DeliveryOutcome) -> Self {
        Self {
            token: token.into(),
            outcome,
        }
    }
}

/// Batch-level transport failures
#[derive(Debug, thiserror::Error)]
pub enum PushError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Push dispatch timed out after {0:?}")]
    Timeout(Duration),

    #[error("Push service rejected batch: {0}")]
    Rejected(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Capability implemented by every push backend
#[async_trait]
pub trait PushTransport: Send + Sync {
    /// Name of this transport (for logging)
    fn name(&self) -> &'static str;

    /// Send the batch; one receipt per message.
    async fn send_batch(
        &self,
        messages: Vec<PushMessage>,
    ) -> Result<Vec<DeliveryReceipt>, PushError>;
}

/// Transport that only logs messages; used when running against a mock device
pub struct LogTransport;

#[async_trait]
impl PushTransport for LogTransport {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn send_batch(
        &self,
        messages: Vec<PushMessage>,
    ) -> Result<Vec<DeliveryReceipt>, PushError> {
        Ok(messages
            .into_iter()
            .map(|m| {
                tracing::info!(to = %m.to, title = %m.title, body = %m.body, "Push (log only)");
                DeliveryReceipt::new(m.to, DeliveryOutcome::Delivered)
            })
            .collect())
    }
}
