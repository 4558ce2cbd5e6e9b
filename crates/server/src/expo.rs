// Expo push transport
//
// Sends the whole batch as one JSON array to the Expo push API and maps the
// returned tickets back onto the tokens, in order. A ticket with
// details.error == "DeviceNotRegistered" marks the token as permanently
// invalid; every other ticket error is an ordinary per-message failure.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error};

use alarmrelay_core::{DeliveryOutcome, DeliveryReceipt, PushError, PushMessage, PushTransport};

pub const DEFAULT_EXPO_PUSH_URL: &str = "https://exp.host/--/api/v2/push/send";

const DEVICE_NOT_REGISTERED: &str = "DeviceNotRegistered";

/// True for `ExponentPushToken[...]` / `ExpoPushToken[...]` tokens
pub fn is_expo_push_token(token: &str) -> bool {
    ["ExponentPushToken[", "ExpoPushToken["].iter().any(|prefix| {
        token
            .strip_prefix(prefix)
            .and_then(|rest| rest.strip_suffix(']'))
            .is_some_and(|inner| !inner.is_empty())
    })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExpoMessage<'a> {
    to: &'a str,
    title: &'a str,
    body: &'a str,
    priority: alarmrelay_core::Priority,
    ttl: u32,
    sound: &'static str,
    channel_id: &'static str,
}

impl<'a> From<&'a PushMessage> for ExpoMessage<'a> {
    fn from(m: &'a PushMessage) -> Self {
        Self {
            to: &m.to,
            title: &m.title,
            body: &m.body,
            priority: m.priority,
            ttl: m.ttl_seconds,
            sound: "default",
            channel_id: m.channel.as_str(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ExpoResponse {
    #[serde(default)]
    data: Vec<ExpoTicket>,
}

#[derive(Debug, Deserialize)]
struct ExpoTicket {
    status: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    details: Option<ExpoTicketDetails>,
}

#[derive(Debug, Deserialize)]
struct ExpoTicketDetails {
    #[serde(default)]
    error: Option<String>,
}

impl ExpoTicket {
    fn outcome(&self) -> DeliveryOutcome {
        if self.status == "ok" {
            return DeliveryOutcome::Delivered;
        }
        let code = self.details.as_ref().and_then(|d| d.error.as_deref());
        if code == Some(DEVICE_NOT_REGISTERED) {
            return DeliveryOutcome::InvalidDestination;
        }
        DeliveryOutcome::Failed(
            code.or(self.message.as_deref())
                .unwrap_or("unknown error")
                .to_string(),
        )
    }
}

pub struct ExpoPushTransport {
    client: Client,
    url: String,
}

impl ExpoPushTransport {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, PushError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PushError::Connection(e.to_string()))?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl PushTransport for ExpoPushTransport {
    fn name(&self) -> &'static str {
        "expo"
    }

    async fn send_batch(
        &self,
        messages: Vec<PushMessage>,
    ) -> Result<Vec<DeliveryReceipt>, PushError> {
        if messages.is_empty() {
            return Ok(Vec::new());
        }

        let body: Vec<ExpoMessage<'_>> = messages.iter().map(ExpoMessage::from).collect();
        debug!(url = %self.url, batch_size = body.len(), "Sending batch to Expo");

        let response = self
            .client
            .post(&self.url)
            .header("Accept", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| PushError::Connection(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            error!(status = %status, body = %text, "Expo push request failed");
            return Err(PushError::Rejected(format!("HTTP {}: {}", status, text)));
        }

        let parsed: ExpoResponse = response
            .json()
            .await
            .map_err(|e| PushError::Serialization(e.to_string()))?;

        let mut tickets = parsed.data.into_iter();
        Ok(messages
            .into_iter()
            .map(|m| {
                let outcome = tickets.next().map_or_else(
                    || DeliveryOutcome::Failed("no ticket returned".to_string()),
                    |ticket| ticket.outcome(),
                );
                DeliveryReceipt::new(m.to, outcome)
            })
            .collect())
    }
}
